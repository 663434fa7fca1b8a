//! Thin wrappers over the `image` codec service.
//!
//! The pipeline only needs "load pixels" and "save PNG"; everything else
//! about the codecs is treated as opaque.

use std::path::Path;

use sudoku_scan_core::{GrayImage, GrayImageView, RgbImage};

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] image::ImageError),
    #[error("invalid buffer shape for {width}x{height} image")]
    BadShape { width: usize, height: usize },
}

/// Decode any supported bitmap into an interleaved RGB buffer.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage, CodecError> {
    let decoded = image::ImageReader::open(path)?.decode()?.to_rgb8();
    let (width, height) = (decoded.width() as usize, decoded.height() as usize);
    RgbImage::from_vec(width, height, decoded.into_raw())
        .ok_or(CodecError::BadShape { width, height })
}

/// Decode straight to grayscale.
pub fn load_gray(path: impl AsRef<Path>) -> Result<GrayImage, CodecError> {
    let decoded = image::ImageReader::open(path)?.decode()?.to_luma8();
    let (width, height) = (decoded.width() as usize, decoded.height() as usize);
    GrayImage::from_vec(width, height, decoded.into_raw())
        .ok_or(CodecError::BadShape { width, height })
}

/// Write an RGB buffer as PNG.
pub fn save_png(path: impl AsRef<Path>, img: &RgbImage) -> Result<(), CodecError> {
    let buf = image::RgbImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
        .ok_or(CodecError::BadShape {
            width: img.width,
            height: img.height,
        })?;
    buf.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Write a gray buffer as PNG (debug dumps).
pub fn save_gray_png(path: impl AsRef<Path>, img: &GrayImageView<'_>) -> Result<(), CodecError> {
    let buf = image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.to_vec())
        .ok_or(CodecError::BadShape {
            width: img.width,
            height: img.height,
        })?;
    buf.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}
