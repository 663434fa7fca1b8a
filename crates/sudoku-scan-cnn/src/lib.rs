//! Small convolutional digit classifier for scanned Sudoku cells.
//!
//! A fixed LeNet-style network with hand-rolled forward and backward
//! passes, mini-batch SGD training with early stopping, MNIST/auxiliary
//! dataset loaders, and binary weight persistence. Class 0 is "empty
//! cell", not the numeral zero.

mod augment;
mod dataset;
mod layer;
mod metrics;
mod model;
mod train;
mod weights;

pub use augment::{augment_sample, AugmentParams};
pub use dataset::{
    generate_empty_samples, load_aux_digits, load_aux_digits_if_present, load_mnist, Dataset,
    DatasetError,
};
pub use layer::{ConvLayer, DenseLayer, MaxPoolLayer};
pub use metrics::{evaluate, EvalReport};
pub use model::{softmax, DigitCnn, IMAGE_SIDE, INPUT_SIZE, NUM_CLASSES};
pub use train::{accuracy, train, TrainConfig, TrainOutcome};
pub use weights::{load_weights, save_weights, WeightsError, WEIGHTS_MAGIC};
