//! The three layer kinds of the digit classifier.
//!
//! Each layer owns its parameters, forward caches, and gradient
//! accumulators for its whole lifetime. Forward passes overwrite the
//! layer's output cache; backward passes accumulate into the gradient
//! buffers and return the gradient with respect to the layer input.

use rand::rngs::StdRng;
use rand::Rng;

fn he_uniform(rng: &mut StdRng, fan_in: usize, n: usize) -> Vec<f32> {
    let limit = (2.0_f32 / fan_in as f32).sqrt();
    (0..n).map(|_| rng.gen_range(-limit..limit)).collect()
}

/// Valid convolution (stride 1, no padding) followed by ReLU.
#[derive(Clone, Debug)]
pub struct ConvLayer {
    pub filters: usize,
    pub ksize: usize,
    pub in_channels: usize,
    pub in_w: usize,
    pub in_h: usize,
    pub out_w: usize,
    pub out_h: usize,
    pub weights: Vec<f32>, // [f][c][ky][kx]
    pub bias: Vec<f32>,
    input: Vec<f32>,      // forward cache
    pub output: Vec<f32>, // post-ReLU cache
    pub(crate) grad_weights: Vec<f32>,
    pub(crate) grad_bias: Vec<f32>,
    vel_weights: Vec<f32>,
    vel_bias: Vec<f32>,
}

impl ConvLayer {
    pub fn new(
        filters: usize,
        ksize: usize,
        in_channels: usize,
        in_w: usize,
        in_h: usize,
        rng: &mut StdRng,
    ) -> Self {
        let fan_in = in_channels * ksize * ksize;
        let n_weights = filters * fan_in;
        let out_w = in_w - ksize + 1;
        let out_h = in_h - ksize + 1;
        Self {
            filters,
            ksize,
            in_channels,
            in_w,
            in_h,
            out_w,
            out_h,
            weights: he_uniform(rng, fan_in, n_weights),
            bias: vec![0.0; filters],
            input: vec![0.0; in_channels * in_w * in_h],
            output: vec![0.0; filters * out_w * out_h],
            grad_weights: vec![0.0; n_weights],
            grad_bias: vec![0.0; filters],
            vel_weights: vec![0.0; n_weights],
            vel_bias: vec![0.0; filters],
        }
    }

    #[inline]
    fn widx(&self, f: usize, c: usize, ky: usize, kx: usize) -> usize {
        ((f * self.in_channels + c) * self.ksize + ky) * self.ksize + kx
    }

    pub fn forward(&mut self, input: &[f32]) -> &[f32] {
        debug_assert_eq!(input.len(), self.in_channels * self.in_w * self.in_h);
        self.input.copy_from_slice(input);

        for f in 0..self.filters {
            for oy in 0..self.out_h {
                for ox in 0..self.out_w {
                    let mut acc = self.bias[f];
                    for c in 0..self.in_channels {
                        let plane = c * self.in_w * self.in_h;
                        for ky in 0..self.ksize {
                            let row = plane + (oy + ky) * self.in_w + ox;
                            let wrow = self.widx(f, c, ky, 0);
                            for kx in 0..self.ksize {
                                acc += self.weights[wrow + kx] * input[row + kx];
                            }
                        }
                    }
                    let out_idx = (f * self.out_h + oy) * self.out_w + ox;
                    self.output[out_idx] = acc.max(0.0);
                }
            }
        }
        &self.output
    }

    /// Accumulate weight/bias gradients and return the input gradient.
    /// The incoming gradient is gated by the ReLU: positions where the
    /// forward output was clamped to zero contribute nothing.
    pub fn backward(&mut self, grad_out: &[f32]) -> Vec<f32> {
        debug_assert_eq!(grad_out.len(), self.output.len());
        let mut grad_in = vec![0.0f32; self.input.len()];

        for f in 0..self.filters {
            for oy in 0..self.out_h {
                for ox in 0..self.out_w {
                    let out_idx = (f * self.out_h + oy) * self.out_w + ox;
                    if self.output[out_idx] <= 0.0 {
                        continue;
                    }
                    let g = grad_out[out_idx];
                    if g == 0.0 {
                        continue;
                    }
                    self.grad_bias[f] += g;
                    for c in 0..self.in_channels {
                        let plane = c * self.in_w * self.in_h;
                        for ky in 0..self.ksize {
                            let row = plane + (oy + ky) * self.in_w + ox;
                            let wrow = self.widx(f, c, ky, 0);
                            for kx in 0..self.ksize {
                                self.grad_weights[wrow + kx] += g * self.input[row + kx];
                                grad_in[row + kx] += g * self.weights[wrow + kx];
                            }
                        }
                    }
                }
            }
        }
        grad_in
    }

    pub fn zero_grads(&mut self) {
        self.grad_weights.iter_mut().for_each(|g| *g = 0.0);
        self.grad_bias.iter_mut().for_each(|g| *g = 0.0);
    }

    pub fn sgd_step(&mut self, lr: f32, momentum: f32) {
        step_params(
            &mut self.weights,
            &self.grad_weights,
            &mut self.vel_weights,
            lr,
            momentum,
        );
        step_params(&mut self.bias, &self.grad_bias, &mut self.vel_bias, lr, momentum);
    }
}

/// Non-overlapping max pooling. Remembers the flat input index of each
/// window's winner so the backward pass can route gradients.
#[derive(Clone, Debug)]
pub struct MaxPoolLayer {
    pub pool: usize,
    pub channels: usize,
    pub in_w: usize,
    pub in_h: usize,
    pub out_w: usize,
    pub out_h: usize,
    argmax: Vec<usize>,
}

impl MaxPoolLayer {
    pub fn new(pool: usize, channels: usize, in_w: usize, in_h: usize) -> Self {
        let out_w = in_w / pool;
        let out_h = in_h / pool;
        Self {
            pool,
            channels,
            in_w,
            in_h,
            out_w,
            out_h,
            argmax: vec![0; channels * out_w * out_h],
        }
    }

    pub fn forward(&mut self, input: &[f32]) -> Vec<f32> {
        debug_assert_eq!(input.len(), self.channels * self.in_w * self.in_h);
        let mut out = vec![0.0f32; self.channels * self.out_w * self.out_h];

        for c in 0..self.channels {
            let plane = c * self.in_w * self.in_h;
            for oy in 0..self.out_h {
                for ox in 0..self.out_w {
                    let mut best = f32::NEG_INFINITY;
                    let mut best_idx = 0usize;
                    for py in 0..self.pool {
                        for px in 0..self.pool {
                            let idx =
                                plane + (oy * self.pool + py) * self.in_w + ox * self.pool + px;
                            if input[idx] > best {
                                best = input[idx];
                                best_idx = idx;
                            }
                        }
                    }
                    let out_idx = (c * self.out_h + oy) * self.out_w + ox;
                    out[out_idx] = best;
                    self.argmax[out_idx] = best_idx;
                }
            }
        }
        out
    }

    /// Route each output gradient to its stored argmax; additive so the
    /// rare tie where two outputs share an input still sums correctly.
    pub fn backward(&self, grad_out: &[f32]) -> Vec<f32> {
        debug_assert_eq!(grad_out.len(), self.argmax.len());
        let mut grad_in = vec![0.0f32; self.channels * self.in_w * self.in_h];
        for (out_idx, &src) in self.argmax.iter().enumerate() {
            grad_in[src] += grad_out[out_idx];
        }
        grad_in
    }
}

/// Fully connected layer with optional ReLU.
#[derive(Clone, Debug)]
pub struct DenseLayer {
    pub in_size: usize,
    pub out_size: usize,
    pub relu: bool,
    pub weights: Vec<f32>, // [o][i]
    pub bias: Vec<f32>,
    input: Vec<f32>,
    pub output: Vec<f32>,
    pub(crate) grad_weights: Vec<f32>,
    pub(crate) grad_bias: Vec<f32>,
    vel_weights: Vec<f32>,
    vel_bias: Vec<f32>,
}

impl DenseLayer {
    pub fn new(in_size: usize, out_size: usize, relu: bool, rng: &mut StdRng) -> Self {
        let n = in_size * out_size;
        Self {
            in_size,
            out_size,
            relu,
            weights: he_uniform(rng, in_size, n),
            bias: vec![0.0; out_size],
            input: vec![0.0; in_size],
            output: vec![0.0; out_size],
            grad_weights: vec![0.0; n],
            grad_bias: vec![0.0; out_size],
            vel_weights: vec![0.0; n],
            vel_bias: vec![0.0; out_size],
        }
    }

    pub fn forward(&mut self, input: &[f32]) -> &[f32] {
        debug_assert_eq!(input.len(), self.in_size);
        self.input.copy_from_slice(input);

        for o in 0..self.out_size {
            let row = o * self.in_size;
            let mut acc = self.bias[o];
            for i in 0..self.in_size {
                acc += self.weights[row + i] * input[i];
            }
            self.output[o] = if self.relu { acc.max(0.0) } else { acc };
        }
        &self.output
    }

    pub fn backward(&mut self, grad_out: &[f32]) -> Vec<f32> {
        debug_assert_eq!(grad_out.len(), self.out_size);
        let mut grad_in = vec![0.0f32; self.in_size];

        for o in 0..self.out_size {
            let g = if self.relu && self.output[o] <= 0.0 {
                0.0
            } else {
                grad_out[o]
            };
            if g == 0.0 {
                continue;
            }
            self.grad_bias[o] += g;
            let row = o * self.in_size;
            for i in 0..self.in_size {
                self.grad_weights[row + i] += g * self.input[i];
                grad_in[i] += g * self.weights[row + i];
            }
        }
        grad_in
    }

    pub fn zero_grads(&mut self) {
        self.grad_weights.iter_mut().for_each(|g| *g = 0.0);
        self.grad_bias.iter_mut().for_each(|g| *g = 0.0);
    }

    pub fn sgd_step(&mut self, lr: f32, momentum: f32) {
        step_params(
            &mut self.weights,
            &self.grad_weights,
            &mut self.vel_weights,
            lr,
            momentum,
        );
        step_params(&mut self.bias, &self.grad_bias, &mut self.vel_bias, lr, momentum);
    }
}

fn step_params(params: &mut [f32], grads: &[f32], velocity: &mut [f32], lr: f32, momentum: f32) {
    if momentum > 0.0 {
        for ((p, &g), v) in params.iter_mut().zip(grads).zip(velocity.iter_mut()) {
            *v = momentum * *v + g;
            *p -= lr * *v;
        }
    } else {
        for (p, &g) in params.iter_mut().zip(grads) {
            *p -= lr * g;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn he_init_respects_bounds() {
        let mut r = rng();
        let w = he_uniform(&mut r, 25, 1000);
        let limit = (2.0_f32 / 25.0).sqrt();
        assert!(w.iter().all(|&v| v > -limit && v < limit));
        // spread should actually use the range, not cluster at zero
        assert!(w.iter().any(|&v| v.abs() > limit / 2.0));
    }

    #[test]
    fn conv_output_shape_is_valid_convolution() {
        let mut r = rng();
        let layer = ConvLayer::new(6, 5, 1, 28, 28, &mut r);
        assert_eq!(layer.out_w, 24);
        assert_eq!(layer.out_h, 24);
        assert_eq!(layer.weights.len(), 6 * 1 * 5 * 5);
    }

    #[test]
    fn conv_forward_matches_hand_computation() {
        let mut r = rng();
        let mut layer = ConvLayer::new(1, 2, 1, 3, 3, &mut r);
        layer.weights.copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);
        layer.bias[0] = 0.5;
        let input = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let out = layer.forward(&input).to_vec();
        // each output = in[y][x] + in[y+1][x+1] + 0.5
        assert_eq!(out, vec![1.0 + 5.0 + 0.5, 2.0 + 6.0 + 0.5, 4.0 + 8.0 + 0.5, 5.0 + 9.0 + 0.5]);
    }

    #[test]
    fn relu_clamps_and_gates_gradients() {
        let mut r = rng();
        let mut layer = ConvLayer::new(1, 1, 1, 2, 1, &mut r);
        layer.weights.copy_from_slice(&[1.0]);
        layer.bias[0] = 0.0;
        let out = layer.forward(&[-3.0, 4.0]).to_vec();
        assert_eq!(out, vec![0.0, 4.0]);

        let grad_in = layer.backward(&[1.0, 1.0]);
        // clamped position passes nothing back
        assert_eq!(grad_in, vec![0.0, 1.0]);
    }

    #[test]
    fn pool_tracks_argmax_and_routes_gradients() {
        let mut layer = MaxPoolLayer::new(2, 1, 4, 2);
        let input = [1.0, 9.0, 2.0, 3.0, 4.0, 5.0, 8.0, 7.0];
        let out = layer.forward(&input);
        assert_eq!(out, vec![9.0, 8.0]);

        let grad_in = layer.backward(&[1.0, 2.0]);
        assert_eq!(grad_in[1], 1.0); // winner of the left window
        assert_eq!(grad_in[6], 2.0); // winner of the right window
        assert_eq!(grad_in.iter().sum::<f32>(), 3.0);
    }

    #[test]
    fn dense_backward_is_transpose_product() {
        let mut r = rng();
        let mut layer = DenseLayer::new(2, 2, false, &mut r);
        layer.weights.copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        layer.bias.copy_from_slice(&[0.0, 0.0]);
        let out = layer.forward(&[1.0, 1.0]).to_vec();
        assert_eq!(out, vec![3.0, 7.0]);

        let grad_in = layer.backward(&[1.0, 1.0]);
        // W^T . g = [1+3, 2+4]
        assert_eq!(grad_in, vec![4.0, 6.0]);
    }

    #[test]
    fn sgd_with_momentum_accumulates_velocity() {
        let mut params = vec![1.0f32];
        let mut vel = vec![0.0f32];
        step_params(&mut params, &[1.0], &mut vel, 0.1, 0.9);
        assert_abs_diff_eq!(params[0], 0.9, epsilon = 1e-6);
        step_params(&mut params, &[1.0], &mut vel, 0.1, 0.9);
        // velocity = 0.9*1 + 1 = 1.9
        assert_abs_diff_eq!(params[0], 0.9 - 0.19, epsilon = 1e-6);
    }
}
