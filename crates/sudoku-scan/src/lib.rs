//! End-to-end Sudoku photo solving.
//!
//! Fuses three styles of reasoning: geometric grid localization and
//! rectification, a small convolutional classifier for the printed digits,
//! and a probability-aware constraint search that reconciles classifier
//! uncertainty with the Sudoku rules. The crates underneath carry the
//! pieces; this one wires them together and owns the CLI binaries.

pub mod compose;
pub mod io;
pub mod params;
pub mod pipeline;
pub mod report;

pub use compose::{compose_solved_image, draw_digit, DIGIT_FONT, SOLVED_COLOR};
pub use io::{load_gray, load_rgb, save_gray_png, save_png, CodecError};
pub use params::{
    sweep_grid, write_best_params, write_results_csv, ParamsError, SweepResult, TrainParams,
};
pub use pipeline::{classify_cells, Pipeline, PipelineError, SolvedPuzzle};
pub use report::{ReportError, ScanReport};
