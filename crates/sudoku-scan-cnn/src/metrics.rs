//! Per-class evaluation metrics.

use crate::dataset::Dataset;
use crate::model::{DigitCnn, NUM_CLASSES};

/// Confusion matrix plus derived per-class precision/recall/F1.
#[derive(Clone, Debug)]
pub struct EvalReport {
    pub accuracy: f32,
    pub avg_f1: f32,
    pub precision: [f32; NUM_CLASSES],
    pub recall: [f32; NUM_CLASSES],
    pub f1: [f32; NUM_CLASSES],
    /// `confusion[actual][predicted]`
    pub confusion: [[u32; NUM_CLASSES]; NUM_CLASSES],
}

/// Run the model over `ds` and compute the full metric set.
pub fn evaluate(model: &mut DigitCnn, ds: &Dataset) -> EvalReport {
    let mut confusion = [[0u32; NUM_CLASSES]; NUM_CLASSES];
    let mut correct = 0usize;

    for (img, &label) in ds.images.iter().zip(&ds.labels) {
        let predicted = model.predict(img) as usize;
        confusion[label as usize][predicted] += 1;
        if predicted == label as usize {
            correct += 1;
        }
    }

    report_from_confusion(confusion, correct, ds.count())
}

fn report_from_confusion(
    confusion: [[u32; NUM_CLASSES]; NUM_CLASSES],
    correct: usize,
    total: usize,
) -> EvalReport {
    let mut precision = [0f32; NUM_CLASSES];
    let mut recall = [0f32; NUM_CLASSES];
    let mut f1 = [0f32; NUM_CLASSES];
    let mut total_f1 = 0f32;

    for class in 0..NUM_CLASSES {
        let tp = confusion[class][class];
        let fp: u32 = (0..NUM_CLASSES)
            .filter(|&i| i != class)
            .map(|i| confusion[i][class])
            .sum();
        let fn_: u32 = (0..NUM_CLASSES)
            .filter(|&j| j != class)
            .map(|j| confusion[class][j])
            .sum();

        precision[class] = if tp + fp > 0 {
            tp as f32 / (tp + fp) as f32
        } else {
            0.0
        };
        recall[class] = if tp + fn_ > 0 {
            tp as f32 / (tp + fn_) as f32
        } else {
            0.0
        };
        f1[class] = if precision[class] + recall[class] > 0.0 {
            2.0 * precision[class] * recall[class] / (precision[class] + recall[class])
        } else {
            0.0
        };
        total_f1 += f1[class];
    }

    EvalReport {
        accuracy: if total > 0 {
            correct as f32 / total as f32
        } else {
            0.0
        },
        avg_f1: total_f1 / NUM_CLASSES as f32,
        precision,
        recall,
        f1,
        confusion,
    }
}
