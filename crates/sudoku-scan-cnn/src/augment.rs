//! Training-time augmentation: rotate, translate, and add noise.

use rand::rngs::StdRng;
use rand::Rng;

#[derive(Clone, Copy, Debug)]
pub struct AugmentParams {
    /// Max rotation magnitude in degrees.
    pub max_rotation_deg: f32,
    /// Max translation magnitude in whole pixels.
    pub max_shift: i32,
    /// Amplitude of additive uniform noise.
    pub noise_amplitude: f32,
}

impl Default for AugmentParams {
    fn default() -> Self {
        Self {
            max_rotation_deg: 10.0,
            max_shift: 2,
            noise_amplitude: 0.05,
        }
    }
}

/// Produce a perturbed copy of a `side`x`side` sample.
///
/// Rotation is a uniform angle about the center with nearest-neighbor
/// resampling, translation an integer shift, and the noise is clamped so
/// values stay inside [0,1].
pub fn augment_sample(
    image: &[f32],
    side: usize,
    params: &AugmentParams,
    rng: &mut StdRng,
) -> Vec<f32> {
    debug_assert_eq!(image.len(), side * side);

    let angle = rng
        .gen_range(-params.max_rotation_deg..=params.max_rotation_deg)
        .to_radians();
    let dx = rng.gen_range(-params.max_shift..=params.max_shift);
    let dy = rng.gen_range(-params.max_shift..=params.max_shift);
    let (sin_a, cos_a) = angle.sin_cos();
    let center = (side as f32 - 1.0) / 2.0;

    let mut out = vec![0.0f32; side * side];
    for y in 0..side {
        for x in 0..side {
            // inverse map: undo translation, then rotate backwards
            let rx = (x as i32 - dx) as f32 - center;
            let ry = (y as i32 - dy) as f32 - center;
            let sx = (cos_a * rx + sin_a * ry + center).round() as i32;
            let sy = (-sin_a * rx + cos_a * ry + center).round() as i32;
            if sx < 0 || sy < 0 || sx >= side as i32 || sy >= side as i32 {
                continue;
            }
            out[y * side + x] = image[sy as usize * side + sx as usize];
        }
    }

    if params.noise_amplitude > 0.0 {
        for v in &mut out {
            *v = (*v + rng.gen_range(0.0..params.noise_amplitude)).clamp(0.0, 1.0);
        }
    }
    out
}
