/// Errors from grid localization and rectification.
#[derive(thiserror::Error, Debug)]
pub enum GridDetectError {
    #[error("no grid found in the image")]
    GridNotFound,
    #[error("grid homography is singular or degenerate")]
    SingularHomography,
}
