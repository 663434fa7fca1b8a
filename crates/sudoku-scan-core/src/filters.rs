//! Grayscale filtering primitives.
//!
//! Every operation borrows a [`GrayImageView`] and returns a fresh owning
//! [`GrayImage`]; nothing mutates its input in place.

use crate::image::{get_gray, GrayImage, GrayImageView, RgbImage};

/// Convert interleaved RGB to gray with integer BT.601 luma weights.
pub fn rgb_to_gray(src: &RgbImage) -> GrayImage {
    let mut data = Vec::with_capacity(src.width * src.height);
    for px in src.data.chunks_exact(3) {
        let l = (299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32) / 1000;
        data.push(l as u8);
    }
    GrayImage {
        width: src.width,
        height: src.height,
        data,
    }
}

#[inline]
fn reflect(i: i32, n: i32) -> i32 {
    if i < 0 {
        -i - 1
    } else if i >= n {
        2 * n - i - 1
    } else {
        i
    }
}

fn gaussian_kernel(ksize: usize, sigma: f32) -> Vec<f32> {
    debug_assert!(ksize % 2 == 1, "kernel size must be odd");
    let half = (ksize / 2) as i32;
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-(i * i) as f32 / s2).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Gaussian blur with an odd `ksize`×`ksize` kernel, reflective borders.
///
/// Run as two separable 1-D passes; the kernel is renormalized so it sums
/// to one and a vanishing sigma degenerates toward the identity.
pub fn gaussian_blur(src: &GrayImageView<'_>, ksize: usize, sigma: f32) -> GrayImage {
    let (w, h) = (src.width, src.height);
    if sigma <= 0.0 || ksize <= 1 {
        return GrayImage {
            width: w,
            height: h,
            data: src.data.to_vec(),
        };
    }
    let kernel = gaussian_kernel(ksize, sigma);
    let half = (ksize / 2) as i32;

    // horizontal pass
    let mut tmp = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (ki, k) in kernel.iter().enumerate() {
                let sx = reflect(x as i32 + ki as i32 - half, w as i32);
                acc += k * src.data[y * w + sx as usize] as f32;
            }
            tmp[y * w + x] = acc;
        }
    }

    // vertical pass
    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (ki, k) in kernel.iter().enumerate() {
                let sy = reflect(y as i32 + ki as i32 - half, h as i32);
                acc += k * tmp[sy as usize * w + x];
            }
            out[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    GrayImage {
        width: w,
        height: h,
        data: out,
    }
}

/// Otsu's threshold: maximize between-class variance over the 256-bin
/// histogram.
pub fn otsu_threshold(src: &GrayImageView<'_>) -> u8 {
    if src.data.is_empty() {
        return 127;
    }

    let mut min_v = 255u8;
    let mut max_v = 0u8;
    for &v in src.data {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        return min_v;
    }

    let mut hist = [0u32; 256];
    for &v in src.data {
        hist[v as usize] += 1;
    }

    let total = src.data.len() as f64;
    let mut sum_total = 0f64;
    for (i, &h) in hist.iter().enumerate() {
        sum_total += (i as f64) * (h as f64);
    }

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += (t as f64) * (h as f64);
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// Binarize against a fixed threshold: `v > t` becomes 255, else 0.
pub fn threshold(src: &GrayImageView<'_>, t: u8) -> GrayImage {
    let data = src.data.iter().map(|&v| if v > t { 255 } else { 0 }).collect();
    GrayImage {
        width: src.width,
        height: src.height,
        data,
    }
}

/// Binarize with the Otsu-selected threshold.
pub fn threshold_otsu(src: &GrayImageView<'_>) -> GrayImage {
    threshold(src, otsu_threshold(src))
}

pub fn invert(src: &GrayImageView<'_>) -> GrayImage {
    let data = src.data.iter().map(|&v| 255 - v).collect();
    GrayImage {
        width: src.width,
        height: src.height,
        data,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Morph {
    Dilate,
    Erode,
}

fn morphology(src: &GrayImageView<'_>, ksize: usize, op: Morph) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let half = (ksize / 2) as i32;
    let mut out = vec![0u8; w * h];

    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let mut best = match op {
                Morph::Dilate => 0u8,
                Morph::Erode => 255u8,
            };
            for dy in -half..=half {
                for dx in -half..=half {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                        continue;
                    }
                    let v = src.data[ny as usize * w + nx as usize];
                    best = match op {
                        Morph::Dilate => best.max(v),
                        Morph::Erode => best.min(v),
                    };
                }
            }
            out[y as usize * w + x as usize] = best;
        }
    }

    GrayImage {
        width: w,
        height: h,
        data: out,
    }
}

/// Neighborhood max over a `ksize`×`ksize` square element.
pub fn dilate(src: &GrayImageView<'_>, ksize: usize) -> GrayImage {
    morphology(src, ksize, Morph::Dilate)
}

/// Neighborhood min over a `ksize`×`ksize` square element.
pub fn erode(src: &GrayImageView<'_>, ksize: usize) -> GrayImage {
    morphology(src, ksize, Morph::Erode)
}

/// Bilinear resize. The right/bottom edges clamp to the nearest source pixel.
pub fn resize_bilinear(src: &GrayImageView<'_>, out_w: usize, out_h: usize) -> GrayImage {
    let mut out = vec![0u8; out_w * out_h];
    if src.width == 0 || src.height == 0 || out_w == 0 || out_h == 0 {
        return GrayImage {
            width: out_w,
            height: out_h,
            data: out,
        };
    }

    let sx = src.width as f32 / out_w as f32;
    let sy = src.height as f32 / out_h as f32;

    for y in 0..out_h {
        for x in 0..out_w {
            let fx = (x as f32 + 0.5) * sx - 0.5;
            let fy = (y as f32 + 0.5) * sy - 0.5;
            let x0 = (fx.floor() as i32).clamp(0, src.width as i32 - 1);
            let y0 = (fy.floor() as i32).clamp(0, src.height as i32 - 1);
            let x1 = (x0 + 1).min(src.width as i32 - 1);
            let y1 = (y0 + 1).min(src.height as i32 - 1);
            let tx = (fx - x0 as f32).clamp(0.0, 1.0);
            let ty = (fy - y0 as f32).clamp(0.0, 1.0);

            let p00 = src.data[y0 as usize * src.width + x0 as usize] as f32;
            let p10 = src.data[y0 as usize * src.width + x1 as usize] as f32;
            let p01 = src.data[y1 as usize * src.width + x0 as usize] as f32;
            let p11 = src.data[y1 as usize * src.width + x1 as usize] as f32;

            let a = p00 + tx * (p10 - p00);
            let b = p01 + tx * (p11 - p01);
            out[y * out_w + x] = (a + ty * (b - a)).round().clamp(0.0, 255.0) as u8;
        }
    }

    GrayImage {
        width: out_w,
        height: out_h,
        data: out,
    }
}

fn sobel_gradients(src: &GrayImageView<'_>, x: i32, y: i32) -> (i32, i32) {
    let p = |dx: i32, dy: i32| get_gray(src, x + dx, y + dy) as i32;
    let gx = -p(-1, -1) + p(1, -1) - 2 * p(-1, 0) + 2 * p(1, 0) - p(-1, 1) + p(1, 1);
    let gy = -p(-1, -1) - 2 * p(0, -1) - p(1, -1) + p(-1, 1) + 2 * p(0, 1) + p(1, 1);
    (gx, gy)
}

/// 3×3 Sobel gradient magnitude, clamped to 255.
pub fn sobel(src: &GrayImageView<'_>) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let mut out = vec![0u8; w * h];
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let (gx, gy) = sobel_gradients(src, x, y);
            let mag = ((gx * gx + gy * gy) as f32).sqrt().min(255.0);
            out[y as usize * w + x as usize] = mag as u8;
        }
    }
    GrayImage {
        width: w,
        height: h,
        data: out,
    }
}

/// Canny-style edge map: Sobel magnitude, double threshold into {0,128,255},
/// then hysteresis to a fixpoint. Weak pixels (128) touching a strong (255)
/// 8-neighbor get promoted; weak pixels that never connect are dropped.
pub fn canny(src: &GrayImageView<'_>, t_lo: u8, t_hi: u8) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let mag = sobel(src);

    let mut edges: Vec<u8> = mag
        .data
        .iter()
        .map(|&m| {
            if m >= t_hi {
                255
            } else if m >= t_lo {
                128
            } else {
                0
            }
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let idx = y as usize * w + x as usize;
                if edges[idx] != 128 {
                    continue;
                }
                'probe: for dy in -1..=1i32 {
                    for dx in -1..=1i32 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                            continue;
                        }
                        if edges[ny as usize * w + nx as usize] == 255 {
                            edges[idx] = 255;
                            changed = true;
                            break 'probe;
                        }
                    }
                }
            }
        }
    }

    for e in &mut edges {
        if *e == 128 {
            *e = 0;
        }
    }

    GrayImage {
        width: w,
        height: h,
        data: edges,
    }
}

/// Scale pixel values into [0,1].
pub fn normalize_to_float(src: &GrayImageView<'_>) -> Vec<f32> {
    src.data.iter().map(|&v| v as f32 / 255.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(w: usize, h: usize) -> GrayImage {
        let data = (0..w * h).map(|i| ((i * 255) / (w * h)) as u8).collect();
        GrayImage::from_vec(w, h, data).unwrap()
    }

    #[test]
    fn blur_kernel_preserves_flat_regions() {
        let img = GrayImage::from_vec(8, 8, vec![200; 64]).unwrap();
        let blurred = gaussian_blur(&img.view(), 5, 1.2);
        assert!(blurred.data.iter().all(|&v| v == 200));
    }

    #[test]
    fn blur_with_tiny_sigma_is_identity() {
        let img = gradient_image(10, 10);
        let blurred = gaussian_blur(&img.view(), 3, 0.0);
        assert_eq!(blurred.data, img.data);
    }

    #[test]
    fn otsu_separates_bimodal_histogram() {
        let mut data = vec![20u8; 50];
        data.extend(vec![220u8; 50]);
        let img = GrayImage::from_vec(10, 10, data).unwrap();
        let t = otsu_threshold(&img.view());
        assert!(t >= 20 && t < 220, "threshold {t} outside the gap");

        let bin = threshold(&img.view(), t);
        assert!(bin.data.iter().all(|&v| v == 0 || v == 255));
    }

    #[test]
    fn otsu_is_stable_on_binary_input() {
        let mut data = vec![0u8; 30];
        data.extend(vec![255u8; 70]);
        let img = GrayImage::from_vec(10, 10, data).unwrap();
        let bin = threshold_otsu(&img.view());
        let again = threshold_otsu(&bin.view());
        assert_eq!(bin.data, again.data);
    }

    #[test]
    fn invert_round_trips() {
        let img = gradient_image(6, 4);
        let back = invert(&invert(&img.view()).view());
        assert_eq!(back.data, img.data);
    }

    #[test]
    fn dilate_grows_and_erode_shrinks() {
        let mut img = GrayImage::new(7, 7);
        img.set(3, 3, 255);
        let grown = dilate(&img.view(), 3);
        assert_eq!(grown.at(2, 3), 255);
        assert_eq!(grown.at(4, 4), 255);
        assert_eq!(grown.at(0, 0), 0);

        let back = erode(&grown.view(), 3);
        assert_eq!(back.at(3, 3), 255);
        assert_eq!(back.at(2, 3), 0);
    }

    #[test]
    fn resize_round_trip_keeps_dimensions() {
        let img = gradient_image(12, 9);
        let small = resize_bilinear(&img.view(), 5, 4);
        let back = resize_bilinear(&small.view(), 12, 9);
        assert_eq!(back.width, img.width);
        assert_eq!(back.height, img.height);
    }

    #[test]
    fn sobel_responds_to_a_step_edge() {
        let mut img = GrayImage::new(8, 8);
        for y in 0..8 {
            for x in 4..8 {
                img.set(x, y, 255);
            }
        }
        let mag = sobel(&img.view());
        assert_eq!(mag.at(1, 4), 0);
        assert!(mag.at(4, 4) > 128);
    }

    #[test]
    fn canny_promotes_connected_weak_pixels() {
        // Vertical step edge: every edge pixel is strong, interior stays 0.
        let mut img = GrayImage::new(16, 16);
        for y in 0..16 {
            for x in 8..16 {
                img.set(x, y, 255);
            }
        }
        let edges = canny(&img.view(), 50, 150);
        assert!(edges.data.iter().all(|&v| v == 0 || v == 255));
        let edge_count = edges.data.iter().filter(|&&v| v == 255).count();
        assert!(edge_count >= 16, "expected a column of edge pixels");
    }

    #[test]
    fn normalize_spans_unit_interval() {
        let img = GrayImage::from_vec(2, 1, vec![0, 255]).unwrap();
        let f = normalize_to_float(&img.view());
        assert_eq!(f, vec![0.0, 1.0]);
    }

    #[test]
    fn rgb_luma_weights_sum_to_unity() {
        let rgb = RgbImage::from_vec(1, 1, vec![255, 255, 255]).unwrap();
        assert_eq!(rgb_to_gray(&rgb).at(0, 0), 255);
        let red = RgbImage::from_vec(1, 1, vec![255, 0, 0]).unwrap();
        assert_eq!(rgb_to_gray(&red).at(0, 0), 76);
    }
}
