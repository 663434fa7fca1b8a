//! Grid-first detection pipeline: preprocess, locate, rectify, extract.

use log::{debug, info};
use sudoku_scan_core::{
    canny, dilate, gaussian_blur, invert, threshold_otsu, GrayImage, GrayImageView, Homography,
};

use crate::cells::{extract_cells, Cell};
use crate::error::GridDetectError;
use crate::locate::{locate_grid, LocateParams};
use crate::quad::Quad;
use crate::rectify::rectify_grid;

#[derive(Clone, Debug)]
pub struct GridDetectorParams {
    pub blur_ksize: usize,
    pub blur_sigma: f32,
    /// Structuring-element side for the localization dilation pass.
    pub dilate_ksize: usize,
    pub canny_lo: u8,
    pub canny_hi: u8,
    pub locate: LocateParams,
}

impl Default for GridDetectorParams {
    fn default() -> Self {
        Self {
            blur_ksize: 5,
            blur_sigma: 1.0,
            dilate_ksize: 3,
            canny_lo: 50,
            canny_hi: 150,
            locate: LocateParams::default(),
        }
    }
}

/// Everything the downstream classifier and compositor need.
#[derive(Clone, Debug)]
pub struct GridDetection {
    pub quad: Quad,
    pub rectified: GrayImage,
    pub h_img_from_rect: Homography,
    pub cells: Vec<Cell>,
}

/// Intermediate stage buffers, exposed for debug dumps.
#[derive(Clone, Debug)]
pub struct StageImages {
    pub blurred: GrayImage,
    pub binary: GrayImage,
    pub dilated: GrayImage,
    pub edges: GrayImage,
}

#[derive(Debug, Default)]
pub struct GridDetector {
    params: GridDetectorParams,
}

impl GridDetector {
    pub fn new(params: GridDetectorParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &GridDetectorParams {
        &self.params
    }

    /// Run preprocessing only: blur, Otsu binarize, invert, and build the
    /// dilated mask and edge map the localizer consumes.
    pub fn preprocess(&self, gray: &GrayImageView<'_>) -> StageImages {
        let p = &self.params;
        let blurred = gaussian_blur(gray, p.blur_ksize, p.blur_sigma);
        let binary = invert(&threshold_otsu(&blurred.view()).view());
        let dilated = dilate(&binary.view(), p.dilate_ksize);
        let edges = canny(&blurred.view(), p.canny_lo, p.canny_hi);
        StageImages {
            blurred,
            binary,
            dilated,
            edges,
        }
    }

    /// Detect the puzzle grid in a grayscale photograph.
    pub fn detect(&self, gray: &GrayImageView<'_>) -> Result<GridDetection, GridDetectError> {
        let stages = self.preprocess(gray);
        self.detect_from_stages(&stages)
    }

    /// Detection continuing from precomputed stage buffers.
    pub fn detect_from_stages(
        &self,
        stages: &StageImages,
    ) -> Result<GridDetection, GridDetectError> {
        let quad = locate_grid(
            &stages.dilated.view(),
            &stages.edges.view(),
            &self.params.locate,
        )?;
        info!(
            "grid located: TL=({:.0},{:.0}) BR=({:.0},{:.0})",
            quad.top_left().x,
            quad.top_left().y,
            quad.bottom_right().x,
            quad.bottom_right().y
        );

        // warp the undilated binary image; dilation only helps localization
        let rectified = rectify_grid(&stages.binary.view(), &quad)?;
        let cells = extract_cells(&rectified.rect.view());
        debug!(
            "extracted {} cells, {} empty",
            cells.len(),
            cells.iter().filter(|c| c.is_empty).count()
        );

        Ok(GridDetection {
            quad,
            rectified: rectified.rect,
            h_img_from_rect: rectified.h_img_from_rect,
            cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rectify::GRID_SIZE;
    use approx::assert_abs_diff_eq;
    use sudoku_scan_core::GrayImage;

    /// White page with a dark square grid frame drawn on it.
    fn synthetic_photo(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> GrayImage {
        let mut img = GrayImage::from_vec(w, h, vec![230; w * h]).unwrap();
        let stroke = 3usize;
        for t in 0..stroke {
            for x in x0..=x1 {
                img.set(x, y0 + t, 20);
                img.set(x, y1 - t, 20);
            }
            for y in y0..=y1 {
                img.set(x0 + t, y, 20);
                img.set(x1 - t, y, 20);
            }
        }
        img
    }

    #[test]
    fn detects_grid_on_clean_synthetic_photo() {
        let img = synthetic_photo(400, 400, 60, 70, 340, 350);
        let detector = GridDetector::default();
        let det = detector.detect(&img.view()).expect("detection");

        assert_eq!(det.rectified.width, GRID_SIZE);
        assert_eq!(det.cells.len(), 81);
        assert_abs_diff_eq!(det.quad.top_left().x, 60.0, epsilon = 4.0);
        assert_abs_diff_eq!(det.quad.top_left().y, 70.0, epsilon = 4.0);
        assert_abs_diff_eq!(det.quad.bottom_right().x, 340.0, epsilon = 4.0);
        assert_abs_diff_eq!(det.quad.bottom_right().y, 350.0, epsilon = 4.0);
    }

    #[test]
    fn photo_with_only_a_speck_has_no_grid() {
        // a lone ink speck: the blob is undersized and no Hough line survives
        let mut img = GrayImage::from_vec(200, 200, vec![230; 200 * 200]).unwrap();
        for y in 90..94 {
            for x in 90..94 {
                img.set(x, y, 20);
            }
        }
        let detector = GridDetector::default();
        assert!(matches!(
            detector.detect(&img.view()),
            Err(GridDetectError::GridNotFound)
        ));
    }
}
