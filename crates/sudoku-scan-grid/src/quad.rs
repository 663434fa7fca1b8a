//! Quadrilateral corner ordering.

use nalgebra::Point2;

/// Four corners in TL, TR, BR, BL order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub corners: [Point2<f32>; 4],
}

impl Quad {
    #[inline]
    pub fn top_left(&self) -> Point2<f32> {
        self.corners[0]
    }

    #[inline]
    pub fn top_right(&self) -> Point2<f32> {
        self.corners[1]
    }

    #[inline]
    pub fn bottom_right(&self) -> Point2<f32> {
        self.corners[2]
    }

    #[inline]
    pub fn bottom_left(&self) -> Point2<f32> {
        self.corners[3]
    }
}

/// Order corners deterministically by the (x+y, y-x) extrema rule:
/// TL minimizes x+y, BR maximizes it, TR minimizes y-x, BL maximizes it.
pub fn order_corners(pts: &[Point2<f32>; 4]) -> Quad {
    let sum = |p: &Point2<f32>| p.x + p.y;
    let diff = |p: &Point2<f32>| p.y - p.x;

    let tl = *pts
        .iter()
        .min_by(|a, b| sum(a).total_cmp(&sum(b)))
        .expect("four corners");
    let br = *pts
        .iter()
        .max_by(|a, b| sum(a).total_cmp(&sum(b)))
        .expect("four corners");
    let tr = *pts
        .iter()
        .min_by(|a, b| diff(a).total_cmp(&diff(b)))
        .expect("four corners");
    let bl = *pts
        .iter()
        .max_by(|a, b| diff(a).total_cmp(&diff(b)))
        .expect("four corners");

    Quad {
        corners: [tl, tr, br, bl],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_a_shuffled_rectangle() {
        let pts = [
            Point2::new(90.0_f32, 10.0),
            Point2::new(10.0, 80.0),
            Point2::new(10.0, 10.0),
            Point2::new(90.0, 80.0),
        ];
        let quad = order_corners(&pts);
        assert_eq!(quad.top_left(), Point2::new(10.0, 10.0));
        assert_eq!(quad.top_right(), Point2::new(90.0, 10.0));
        assert_eq!(quad.bottom_right(), Point2::new(90.0, 80.0));
        assert_eq!(quad.bottom_left(), Point2::new(10.0, 80.0));
    }

    #[test]
    fn orders_a_perspective_skewed_quad() {
        let pts = [
            Point2::new(620.0_f32, 590.0),
            Point2::new(50.0, 50.0),
            Point2::new(30.0, 560.0),
            Point2::new(600.0, 80.0),
        ];
        let quad = order_corners(&pts);
        assert_eq!(quad.top_left(), Point2::new(50.0, 50.0));
        assert_eq!(quad.top_right(), Point2::new(600.0, 80.0));
        assert_eq!(quad.bottom_right(), Point2::new(620.0, 590.0));
        assert_eq!(quad.bottom_left(), Point2::new(30.0, 560.0));
    }

    #[test]
    fn diagonal_order_is_monotone_in_corner_sum() {
        let pts = [
            Point2::new(5.0_f32, 3.0),
            Point2::new(40.0, 2.0),
            Point2::new(42.0, 44.0),
            Point2::new(3.0, 41.0),
        ];
        let q = order_corners(&pts);
        let s = |p: Point2<f32>| p.x + p.y;
        assert!(s(q.corners[0]) <= s(q.corners[1]));
        assert!(s(q.corners[1]) <= s(q.corners[2]));
    }
}
