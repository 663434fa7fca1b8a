//! Perspective rectification of the located grid.

use nalgebra::Point2;
use sudoku_scan_core::{homography_from_4pt, warp_perspective_nearest, GrayImage, GrayImageView, Homography};

use crate::error::GridDetectError;
use crate::quad::Quad;

/// Side of one normalized cell in pixels.
pub const CELL_SIZE: usize = 28;

/// Side of the rectified grid; 9 cells tile it exactly.
pub const GRID_SIZE: usize = 9 * CELL_SIZE;

/// A rectified grid together with the homography that produced it.
#[derive(Clone, Debug)]
pub struct RectifiedGrid {
    pub rect: GrayImage,
    pub h_img_from_rect: Homography,
}

/// Warp the ordered quad onto a `GRID_SIZE` x `GRID_SIZE` square.
///
/// The homography maps rectified coordinates to image coordinates, so the
/// warp walks destination pixels and samples backwards; no separate matrix
/// inversion step is needed.
pub fn rectify_grid(
    src: &GrayImageView<'_>,
    quad: &Quad,
) -> Result<RectifiedGrid, GridDetectError> {
    let s = GRID_SIZE as f32;
    let rect_corners = [
        Point2::new(0.0_f32, 0.0),
        Point2::new(s, 0.0),
        Point2::new(s, s),
        Point2::new(0.0, s),
    ];

    let h_img_from_rect = homography_from_4pt(&rect_corners, &quad.corners)
        .ok_or(GridDetectError::SingularHomography)?;

    let rect = warp_perspective_nearest(src, h_img_from_rect, GRID_SIZE, GRID_SIZE);
    Ok(RectifiedGrid {
        rect,
        h_img_from_rect,
    })
}
