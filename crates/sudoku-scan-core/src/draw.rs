//! Debug drawing on RGB buffers.

use crate::image::RgbImage;
use nalgebra::Point2;

fn plot_thick(img: &mut RgbImage, x: i32, y: i32, color: [u8; 3], thickness: u32) {
    let r = thickness as i32 / 2;
    for dy in -r..=r {
        for dx in -r..=r {
            let (px, py) = (x + dx, y + dy);
            if px < 0 || py < 0 || px >= img.width as i32 || py >= img.height as i32 {
                continue;
            }
            img.set(px as usize, py as usize, color);
        }
    }
}

/// Bresenham line with a square pen of the given thickness.
pub fn draw_line(
    img: &mut RgbImage,
    from: Point2<f32>,
    to: Point2<f32>,
    color: [u8; 3],
    thickness: u32,
) {
    let mut x0 = from.x.round() as i32;
    let mut y0 = from.y.round() as i32;
    let x1 = to.x.round() as i32;
    let y1 = to.y.round() as i32;

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        plot_thick(img, x0, y0, color, thickness.max(1));
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Outline a quadrilateral given TL, TR, BR, BL corners.
pub fn draw_quad(img: &mut RgbImage, corners: &[Point2<f32>; 4], color: [u8; 3], thickness: u32) {
    for i in 0..4 {
        draw_line(img, corners[i], corners[(i + 1) % 4], color, thickness);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_line_covers_span() {
        let mut img = RgbImage::new(10, 5);
        draw_line(
            &mut img,
            Point2::new(1.0, 2.0),
            Point2::new(8.0, 2.0),
            [255, 0, 0],
            1,
        );
        for x in 1..=8 {
            assert_eq!(img.at(x, 2), [255, 0, 0]);
        }
        assert_eq!(img.at(0, 2), [0, 0, 0]);
    }

    #[test]
    fn diagonal_line_touches_endpoints() {
        let mut img = RgbImage::new(10, 10);
        draw_line(
            &mut img,
            Point2::new(0.0, 0.0),
            Point2::new(9.0, 9.0),
            [0, 255, 0],
            1,
        );
        assert_eq!(img.at(0, 0), [0, 255, 0]);
        assert_eq!(img.at(9, 9), [0, 255, 0]);
        assert_eq!(img.at(5, 5), [0, 255, 0]);
    }

    #[test]
    fn thickness_widens_the_stroke() {
        let mut img = RgbImage::new(10, 10);
        draw_line(
            &mut img,
            Point2::new(2.0, 5.0),
            Point2::new(8.0, 5.0),
            [0, 0, 255],
            3,
        );
        assert_eq!(img.at(5, 4), [0, 0, 255]);
        assert_eq!(img.at(5, 6), [0, 0, 255]);
        assert_eq!(img.at(5, 2), [0, 0, 0]);
    }

    #[test]
    fn quad_outline_leaves_interior_untouched() {
        let mut img = RgbImage::new(20, 20);
        let quad = [
            Point2::new(2.0_f32, 2.0),
            Point2::new(17.0, 2.0),
            Point2::new(17.0, 17.0),
            Point2::new(2.0, 17.0),
        ];
        draw_quad(&mut img, &quad, [255, 0, 0], 1);
        assert_eq!(img.at(2, 2), [255, 0, 0]);
        assert_eq!(img.at(10, 10), [0, 0, 0]);
    }
}
