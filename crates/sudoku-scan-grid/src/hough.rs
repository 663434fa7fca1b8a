//! Hough-transform fallback for grid localization.
//!
//! Used when the largest connected component does not span enough of the
//! frame; straight grid borders still vote strongly in (rho, theta) space.

use nalgebra::Point2;
use sudoku_scan_core::GrayImageView;

use crate::components::FOREGROUND;

/// One polar-parameterized line with its accumulator votes.
#[derive(Clone, Copy, Debug)]
pub struct HoughLine {
    pub rho: f32,
    pub theta_deg: usize,
    pub votes: u32,
}

#[derive(Clone, Debug)]
pub struct HoughParams {
    /// Minimum accumulator votes for a local maximum to survive.
    pub vote_threshold: u32,
    /// How many strongest lines per orientation class to consider.
    pub top_lines_per_class: usize,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            vote_threshold: 60,
            top_lines_per_class: 20,
        }
    }
}

// theta spans [0, 180) so each line votes in exactly one bin column
const THETA_BINS: usize = 180;

/// Accumulate votes for every (rho, integer-degree theta) pair from edge
/// pixels, then keep 3x3-window local maxima above the vote threshold.
pub fn hough_lines(edges: &GrayImageView<'_>, params: &HoughParams) -> Vec<HoughLine> {
    let (w, h) = (edges.width, edges.height);
    let diag = ((w * w + h * h) as f32).sqrt().ceil() as i32;
    let rho_bins = (2 * diag + 1) as usize;

    let (sin_t, cos_t): (Vec<f32>, Vec<f32>) = (0..THETA_BINS)
        .map(|t| (t as f32).to_radians().sin_cos())
        .unzip();

    let mut acc = vec![0u32; rho_bins * THETA_BINS];
    for y in 0..h {
        for x in 0..w {
            if edges.data[y * w + x] <= FOREGROUND {
                continue;
            }
            for t in 0..THETA_BINS {
                let rho = x as f32 * cos_t[t] + y as f32 * sin_t[t];
                let r = rho.round() as i32 + diag;
                acc[r as usize * THETA_BINS + t] += 1;
            }
        }
    }

    let mut lines = Vec::new();
    for r in 0..rho_bins {
        for t in 0..THETA_BINS {
            let votes = acc[r * THETA_BINS + t];
            if votes <= params.vote_threshold {
                continue;
            }

            let mut is_peak = true;
            'window: for dr in -1..=1i32 {
                for dt in -1..=1i32 {
                    if dr == 0 && dt == 0 {
                        continue;
                    }
                    let (nr, nt) = (r as i32 + dr, t as i32 + dt);
                    if nr < 0 || nt < 0 || nr >= rho_bins as i32 || nt >= THETA_BINS as i32 {
                        continue;
                    }
                    if acc[nr as usize * THETA_BINS + nt as usize] > votes {
                        is_peak = false;
                        break 'window;
                    }
                }
            }
            if is_peak {
                lines.push(HoughLine {
                    rho: (r as i32 - diag) as f32,
                    theta_deg: t,
                    votes,
                });
            }
        }
    }

    lines
}

#[inline]
fn is_vertical(theta_deg: usize) -> bool {
    theta_deg < 30 || theta_deg > 150
}

#[inline]
fn is_horizontal(theta_deg: usize) -> bool {
    theta_deg > 60 && theta_deg < 120
}

/// Signed distance comparable across the theta wrap: a near-vertical line
/// tilted past 150 degrees carries a negated rho, so fold it back before
/// taking extrema.
#[inline]
fn canonical_rho(l: &HoughLine) -> f32 {
    if l.theta_deg > 90 {
        -l.rho
    } else {
        l.rho
    }
}

/// Intersect two polar lines. Near-parallel pairs have a vanishing
/// determinant and intersect "at (0,0)", which callers treat as invalid.
fn intersect(a: &HoughLine, b: &HoughLine) -> Point2<f32> {
    let (sa, ca) = (a.theta_deg as f32).to_radians().sin_cos();
    let (sb, cb) = (b.theta_deg as f32).to_radians().sin_cos();
    let det = ca * sb - sa * cb;
    if det.abs() < 1e-6 {
        return Point2::new(0.0, 0.0);
    }
    let x = (a.rho * sb - b.rho * sa) / det;
    let y = (b.rho * ca - a.rho * cb) / det;
    Point2::new(x, y)
}

fn corner_in_tolerance(p: Point2<f32>, w: usize, h: usize) -> bool {
    let (half_w, half_h) = (w as f32 / 2.0, h as f32 / 2.0);
    p.x > -half_w && p.x < w as f32 + half_w && p.y > -half_h && p.y < h as f32 + half_h
}

/// Recover the outermost grid corners from Hough lines.
///
/// Splits detected lines into vertical and horizontal classes, takes the rho
/// extrema among the strongest of each class as the outer left/right and
/// top/bottom borders, and intersects them pairwise. Returns `None` when
/// either class is empty or a corner lands too far outside the frame.
pub fn hough_grid_corners(
    edges: &GrayImageView<'_>,
    params: &HoughParams,
) -> Option<[Point2<f32>; 4]> {
    let mut lines = hough_lines(edges, params);
    lines.sort_by(|a, b| b.votes.cmp(&a.votes));

    let vertical: Vec<HoughLine> = lines
        .iter()
        .filter(|l| is_vertical(l.theta_deg))
        .take(params.top_lines_per_class)
        .copied()
        .collect();
    let horizontal: Vec<HoughLine> = lines
        .iter()
        .filter(|l| is_horizontal(l.theta_deg))
        .take(params.top_lines_per_class)
        .copied()
        .collect();

    if vertical.is_empty() || horizontal.is_empty() {
        return None;
    }

    let left = vertical
        .iter()
        .min_by(|a, b| canonical_rho(a).total_cmp(&canonical_rho(b)))?;
    let right = vertical
        .iter()
        .max_by(|a, b| canonical_rho(a).total_cmp(&canonical_rho(b)))?;
    let top = horizontal
        .iter()
        .min_by(|a, b| a.rho.total_cmp(&b.rho))?;
    let bottom = horizontal
        .iter()
        .max_by(|a, b| a.rho.total_cmp(&b.rho))?;

    if std::ptr::eq(left, right) || std::ptr::eq(top, bottom) {
        return None;
    }

    let corners = [
        intersect(top, left),
        intersect(top, right),
        intersect(bottom, right),
        intersect(bottom, left),
    ];

    // the (0,0) sentinel marks a parallel-line intersection
    let origin_like = |p: &Point2<f32>| p.x.abs() < 1e-3 && p.y.abs() < 1e-3;
    if corners.iter().any(origin_like) {
        return None;
    }

    for p in &corners {
        if !corner_in_tolerance(*p, edges.width, edges.height) {
            return None;
        }
    }

    Some(corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sudoku_scan_core::GrayImage;

    fn frame_image(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for x in x0..=x1 {
            img.set(x, y0, 255);
            img.set(x, y1, 255);
        }
        for y in y0..=y1 {
            img.set(x0, y, 255);
            img.set(x1, y, 255);
        }
        img
    }

    #[test]
    fn detects_axis_aligned_border_lines() {
        let img = frame_image(200, 200, 20, 30, 180, 170);
        let params = HoughParams {
            vote_threshold: 80,
            ..HoughParams::default()
        };
        let lines = hough_lines(&img.view(), &params);
        assert!(
            lines.iter().any(|l| l.theta_deg == 0 && (l.rho - 20.0).abs() <= 1.0),
            "missing left border"
        );
        assert!(
            lines.iter().any(|l| l.theta_deg == 90 && (l.rho - 30.0).abs() <= 1.0),
            "missing top border"
        );
    }

    #[test]
    fn recovers_frame_corners() {
        let img = frame_image(200, 200, 20, 30, 180, 170);
        let params = HoughParams {
            vote_threshold: 80,
            ..HoughParams::default()
        };
        let corners = hough_grid_corners(&img.view(), &params).expect("corners");
        let expect = [
            Point2::new(20.0_f32, 30.0),
            Point2::new(180.0, 30.0),
            Point2::new(180.0, 170.0),
            Point2::new(20.0, 170.0),
        ];
        for (c, e) in corners.iter().zip(expect.iter()) {
            assert_abs_diff_eq!(c.x, e.x, epsilon = 2.0);
            assert_abs_diff_eq!(c.y, e.y, epsilon = 2.0);
        }
    }

    #[test]
    fn parallel_lines_intersect_at_origin_sentinel() {
        let a = HoughLine {
            rho: 10.0,
            theta_deg: 0,
            votes: 100,
        };
        let b = HoughLine {
            rho: 50.0,
            theta_deg: 0,
            votes: 100,
        };
        let p = intersect(&a, &b);
        assert_eq!((p.x, p.y), (0.0, 0.0));
    }

    #[test]
    fn blank_image_has_no_corners() {
        let img = GrayImage::new(100, 100);
        assert!(hough_grid_corners(&img.view(), &HoughParams::default()).is_none());
    }
}
