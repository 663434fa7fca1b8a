//! Grid localization: largest blob first, Hough lines as fallback.

use log::{debug, info};
use nalgebra::Point2;
use sudoku_scan_core::GrayImageView;

use crate::components::{label_components, largest_component};
use crate::error::GridDetectError;
use crate::hough::{hough_grid_corners, HoughParams};
use crate::quad::{order_corners, Quad};

#[derive(Clone, Debug)]
pub struct LocateParams {
    /// Minimum bounding-box area of the winning blob, as a fraction of the
    /// image area, for the blob strategy to be trusted.
    pub min_bbox_frac: f32,
    pub hough: HoughParams,
}

impl Default for LocateParams {
    fn default() -> Self {
        Self {
            min_bbox_frac: 1.0 / 16.0,
            hough: HoughParams::default(),
        }
    }
}

/// Corner extrema of one labeled component's foreground pixels.
fn component_corners(labels: &[u32], width: usize, label: u32) -> [Point2<f32>; 4] {
    let mut tl = (f32::MAX, Point2::new(0.0_f32, 0.0));
    let mut br = (f32::MIN, Point2::new(0.0_f32, 0.0));
    let mut tr = (f32::MAX, Point2::new(0.0_f32, 0.0));
    let mut bl = (f32::MIN, Point2::new(0.0_f32, 0.0));

    for (i, &l) in labels.iter().enumerate() {
        if l != label {
            continue;
        }
        let p = Point2::new((i % width) as f32, (i / width) as f32);
        let sum = p.x + p.y;
        let diff = p.y - p.x;
        if sum < tl.0 {
            tl = (sum, p);
        }
        if sum > br.0 {
            br = (sum, p);
        }
        if diff < tr.0 {
            tr = (diff, p);
        }
        if diff > bl.0 {
            bl = (diff, p);
        }
    }

    [tl.1, tr.1, br.1, bl.1]
}

/// Find the quadrilateral bounding the puzzle.
///
/// `mask` is the dilated binary image (ink = 255) used for the blob
/// strategy; `edges` is the edge map consulted by the Hough fallback when
/// the largest blob's bounding box covers less than `min_bbox_frac` of the
/// frame.
pub fn locate_grid(
    mask: &GrayImageView<'_>,
    edges: &GrayImageView<'_>,
    params: &LocateParams,
) -> Result<Quad, GridDetectError> {
    let image_area = mask.width * mask.height;
    let (labels, stats) = label_components(mask);

    if let Some(winner) = largest_component(&stats) {
        let frac = winner.bbox_area() as f32 / image_area as f32;
        debug!(
            "largest blob: area={} bbox={}x{} ({:.3} of frame)",
            winner.area,
            winner.max_x - winner.min_x + 1,
            winner.max_y - winner.min_y + 1,
            frac
        );
        if frac >= params.min_bbox_frac {
            let corners = component_corners(&labels, mask.width, winner.label);
            return Ok(order_corners(&corners));
        }
    }

    info!("largest blob undersized, falling back to Hough lines");
    let corners = hough_grid_corners(edges, &params.hough).ok_or(GridDetectError::GridNotFound)?;
    Ok(order_corners(&corners))
}
