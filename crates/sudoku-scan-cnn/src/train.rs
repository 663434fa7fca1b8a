//! Mini-batch SGD training with validation-driven early stopping.

use log::info;
use rand::rngs::StdRng;

use crate::dataset::Dataset;
use crate::model::DigitCnn;

/// Improvements below this don't count for the checkpoint.
const MIN_IMPROVEMENT: f32 = 0.001;

/// Epochs without improvement before stopping.
const PATIENCE: usize = 5;

#[derive(Clone, Copy, Debug)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub momentum: f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.01,
            momentum: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TrainOutcome {
    pub best_accuracy: f32,
    pub epochs_run: usize,
    pub stopped_early: bool,
}

/// Fraction of validation samples the model classifies correctly.
pub fn accuracy(model: &mut DigitCnn, ds: &Dataset) -> f32 {
    if ds.count() == 0 {
        return 0.0;
    }
    let correct = ds
        .images
        .iter()
        .zip(&ds.labels)
        .filter(|(img, &label)| model.predict(img) == label)
        .count();
    correct as f32 / ds.count() as f32
}

/// Train `model` on `train_set`, validating each epoch against `valid`.
///
/// Each epoch reshuffles the training set, walks it in mini-batches, and
/// applies one SGD step per batch at `learning_rate / batch_size`. The best
/// validation checkpoint (improvement of at least 0.001) is kept; after
/// five stale epochs training stops early and the checkpoint is restored.
pub fn train(
    model: &mut DigitCnn,
    train_set: &mut Dataset,
    valid: &Dataset,
    cfg: &TrainConfig,
    rng: &mut StdRng,
) -> TrainOutcome {
    let mut best_accuracy = 0.0f32;
    let mut best_weights: Option<Vec<f32>> = None;
    let mut stale_epochs = 0usize;
    let mut epochs_run = 0usize;
    let mut stopped_early = false;

    for epoch in 0..cfg.epochs {
        train_set.shuffle(rng);

        let mut batch_start = 0usize;
        while batch_start < train_set.count() {
            let batch_end = (batch_start + cfg.batch_size).min(train_set.count());
            model.zero_gradients();
            for i in batch_start..batch_end {
                let probs = model.forward(&train_set.images[i]);
                model.backward(&probs, train_set.labels[i]);
            }
            model.apply_gradients(cfg.learning_rate, batch_end - batch_start, cfg.momentum);
            batch_start = batch_end;
        }

        epochs_run = epoch + 1;
        let val_accuracy = accuracy(model, valid);
        info!(
            "epoch {}/{}: validation accuracy {:.4}",
            epochs_run, cfg.epochs, val_accuracy
        );

        if val_accuracy > best_accuracy + MIN_IMPROVEMENT {
            best_accuracy = val_accuracy;
            best_weights = Some(model.snapshot());
            stale_epochs = 0;
        } else {
            stale_epochs += 1;
            if stale_epochs >= PATIENCE {
                info!("no improvement in {} epochs, stopping early", PATIENCE);
                stopped_early = true;
                break;
            }
        }
    }

    if let Some(weights) = best_weights {
        model.restore(&weights);
    }

    TrainOutcome {
        best_accuracy,
        epochs_run,
        stopped_early,
    }
}
