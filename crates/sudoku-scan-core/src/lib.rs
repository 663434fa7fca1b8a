//! Image buffers, filters, and projective geometry for the sudoku-scan
//! pipeline.
//!
//! This crate is intentionally small and self-contained: owning buffers,
//! borrow-friendly views, the grayscale filter set, and the 4-point
//! homography machinery. It knows nothing about Sudoku.

mod draw;
mod filters;
mod homography;
mod image;
mod logger;

pub use draw::{draw_line, draw_quad};
pub use filters::{
    canny, dilate, erode, gaussian_blur, invert, normalize_to_float, otsu_threshold,
    resize_bilinear, rgb_to_gray, sobel, threshold, threshold_otsu,
};
pub use homography::{homography_from_4pt, warp_perspective_nearest, Homography};
pub use image::{
    sample_bilinear, sample_bilinear_u8, sample_nearest_u8, GrayImage, GrayImageView, RgbImage,
};
pub use logger::init_with_level;
