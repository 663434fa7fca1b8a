//! The digit classifier: a fixed LeNet-style stack.
//!
//! 28x28x1 -> Conv(6,5)+ReLU -> Pool(2) -> Conv(16,5)+ReLU -> Pool(2)
//! -> Dense(256->120)+ReLU -> Dense(120->10) -> softmax.
//!
//! The topology is deliberately not generic; cell extraction, weight
//! serialization, and the candidate tables all depend on these exact
//! shapes.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::layer::{ConvLayer, DenseLayer, MaxPoolLayer};

pub const IMAGE_SIDE: usize = 28;
pub const INPUT_SIZE: usize = IMAGE_SIDE * IMAGE_SIDE;
pub const NUM_CLASSES: usize = 10;

#[derive(Clone, Debug)]
pub struct DigitCnn {
    conv1: ConvLayer,
    pool1: MaxPoolLayer,
    conv2: ConvLayer,
    pool2: MaxPoolLayer,
    fc1: DenseLayer,
    fc2: DenseLayer,
}

/// Numerically stable softmax: subtract the max logit first.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl DigitCnn {
    pub fn new(rng: &mut StdRng) -> Self {
        let conv1 = ConvLayer::new(6, 5, 1, IMAGE_SIDE, IMAGE_SIDE, rng); // -> 24x24x6
        let pool1 = MaxPoolLayer::new(2, 6, 24, 24); // -> 12x12x6
        let conv2 = ConvLayer::new(16, 5, 6, 12, 12, rng); // -> 8x8x16
        let pool2 = MaxPoolLayer::new(2, 16, 8, 8); // -> 4x4x16 = 256
        let fc1 = DenseLayer::new(256, 120, true, rng);
        let fc2 = DenseLayer::new(120, NUM_CLASSES, false, rng);
        Self {
            conv1,
            pool1,
            conv2,
            pool2,
            fc1,
            fc2,
        }
    }

    /// A fresh model with entropy-seeded initialization.
    pub fn random() -> Self {
        let mut rng = StdRng::from_entropy();
        Self::new(&mut rng)
    }

    /// Forward pass producing the class probability simplex.
    pub fn forward(&mut self, input: &[f32]) -> Vec<f32> {
        debug_assert_eq!(input.len(), INPUT_SIZE);
        self.conv1.forward(input);
        let p1 = self.pool1.forward(&self.conv1.output);
        self.conv2.forward(&p1);
        let p2 = self.pool2.forward(&self.conv2.output);
        self.fc1.forward(&p2);
        self.fc2.forward(&self.fc1.output);
        softmax(&self.fc2.output)
    }

    /// Accumulate gradients for one sample. `probs` must come from the
    /// matching `forward` call; cross-entropy against the one-hot label
    /// makes the output gradient `softmax - target`.
    pub fn backward(&mut self, probs: &[f32], label: u8) {
        debug_assert_eq!(probs.len(), NUM_CLASSES);
        let mut grad: Vec<f32> = probs.to_vec();
        grad[label as usize] -= 1.0;

        let grad = self.fc2.backward(&grad);
        let grad = self.fc1.backward(&grad);
        let grad = self.pool2.backward(&grad);
        let grad = self.conv2.backward(&grad);
        let grad = self.pool1.backward(&grad);
        // the input-image gradient is computed and discarded
        let _ = self.conv1.backward(&grad);
    }

    /// Class with the highest probability.
    pub fn predict(&mut self, input: &[f32]) -> u8 {
        let probs = self.forward(input);
        probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i as u8)
            .unwrap_or(0)
    }

    pub fn zero_gradients(&mut self) {
        self.conv1.zero_grads();
        self.conv2.zero_grads();
        self.fc1.zero_grads();
        self.fc2.zero_grads();
    }

    /// One SGD step over the accumulated gradients with effective learning
    /// rate `lr / batch_size`.
    pub fn apply_gradients(&mut self, lr: f32, batch_size: usize, momentum: f32) {
        let eff = lr / batch_size.max(1) as f32;
        self.conv1.sgd_step(eff, momentum);
        self.conv2.sgd_step(eff, momentum);
        self.fc1.sgd_step(eff, momentum);
        self.fc2.sgd_step(eff, momentum);
    }

    /// Flatten all parameters in serialization order:
    /// conv1 w, conv1 b, conv2 w, conv2 b, fc1 w, fc1 b, fc2 w, fc2 b.
    pub fn snapshot(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(Self::parameter_count());
        out.extend_from_slice(&self.conv1.weights);
        out.extend_from_slice(&self.conv1.bias);
        out.extend_from_slice(&self.conv2.weights);
        out.extend_from_slice(&self.conv2.bias);
        out.extend_from_slice(&self.fc1.weights);
        out.extend_from_slice(&self.fc1.bias);
        out.extend_from_slice(&self.fc2.weights);
        out.extend_from_slice(&self.fc2.bias);
        out
    }

    /// Restore parameters from a `snapshot`-ordered slice.
    pub fn restore(&mut self, flat: &[f32]) {
        assert_eq!(flat.len(), Self::parameter_count());
        let mut off = 0usize;
        let mut take = |dst: &mut [f32]| {
            dst.copy_from_slice(&flat[off..off + dst.len()]);
            off += dst.len();
        };
        take(&mut self.conv1.weights);
        take(&mut self.conv1.bias);
        take(&mut self.conv2.weights);
        take(&mut self.conv2.bias);
        take(&mut self.fc1.weights);
        take(&mut self.fc1.bias);
        take(&mut self.fc2.weights);
        take(&mut self.fc2.bias);
    }

    /// Flatten the gradient accumulators in `snapshot` order. Diagnostic
    /// companion to `snapshot`; used by the gradient checks.
    pub fn gradient_snapshot(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(Self::parameter_count());
        out.extend_from_slice(&self.conv1.grad_weights);
        out.extend_from_slice(&self.conv1.grad_bias);
        out.extend_from_slice(&self.conv2.grad_weights);
        out.extend_from_slice(&self.conv2.grad_bias);
        out.extend_from_slice(&self.fc1.grad_weights);
        out.extend_from_slice(&self.fc1.grad_bias);
        out.extend_from_slice(&self.fc2.grad_weights);
        out.extend_from_slice(&self.fc2.grad_bias);
        out
    }

    pub const fn parameter_count() -> usize {
        let conv1 = 6 * 1 * 5 * 5 + 6;
        let conv2 = 16 * 6 * 5 * 5 + 16;
        let fc1 = 256 * 120 + 120;
        let fc2 = 120 * 10 + 10;
        conv1 + conv2 + fc1 + fc2
    }
}
