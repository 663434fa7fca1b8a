//! The end-to-end pipeline: photograph in, solved puzzle image out.

use std::path::{Path, PathBuf};

use log::{info, warn};

use sudoku_scan_cnn::{load_weights, DigitCnn, WeightsError};
use sudoku_scan_core::{draw_quad, rgb_to_gray, GrayImage, GrayImageView, RgbImage};
use sudoku_scan_grid::{Cell, GridDetectError, GridDetector, GridDetectorParams, Quad};
use sudoku_scan_solver::{solve_from_candidates, Board, CellCandidates, SolveError};

use crate::compose::compose_solved_image;
use crate::io::{load_rgb, save_gray_png, save_png, CodecError};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Weights(#[from] WeightsError),
    #[error(transparent)]
    Grid(#[from] GridDetectError),
    #[error(transparent)]
    Solve(#[from] SolveError),
}

/// Result bundle of one pipeline run.
#[derive(Clone, Debug)]
pub struct SolvedPuzzle {
    pub board: Board,
    pub quad: Quad,
    pub rectified: GrayImage,
    pub output: RgbImage,
}

/// Turn normalized cells into the solver's candidate table. Cells flagged
/// empty by the extractor never reach the classifier.
pub fn classify_cells(model: &mut DigitCnn, cells: &[Cell]) -> Vec<CellCandidates> {
    cells
        .iter()
        .map(|cell| {
            if cell.is_empty {
                CellCandidates::empty()
            } else {
                let input = sudoku_scan_core::normalize_to_float(&cell.image.view());
                let probs = model.forward(&input);
                CellCandidates::from_scores(&probs)
            }
        })
        .collect()
}

pub struct Pipeline {
    detector: GridDetector,
    model: DigitCnn,
    debug_dir: Option<PathBuf>,
}

impl Pipeline {
    /// Build a pipeline around an already-initialized model.
    pub fn with_model(model: DigitCnn, params: GridDetectorParams) -> Self {
        Self {
            detector: GridDetector::new(params),
            model,
            debug_dir: None,
        }
    }

    /// Build a pipeline loading classifier weights from disk.
    pub fn from_weights(
        weights: impl AsRef<Path>,
        params: GridDetectorParams,
    ) -> Result<Self, PipelineError> {
        let mut model = DigitCnn::random();
        load_weights(&mut model, weights)?;
        Ok(Self::with_model(model, params))
    }

    /// Dump intermediate stage images into `dir` on every run.
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    /// Full run from a grayscale buffer.
    pub fn solve_gray(&mut self, gray: &GrayImageView<'_>) -> Result<SolvedPuzzle, PipelineError> {
        let stages = self.detector.preprocess(gray);
        if let Some(dir) = self.debug_dir.clone() {
            self.dump_stage(&dir, "blurred.png", &stages.blurred.view());
            self.dump_stage(&dir, "binary.png", &stages.binary.view());
            self.dump_stage(&dir, "dilated.png", &stages.dilated.view());
            self.dump_stage(&dir, "edges.png", &stages.edges.view());
        }

        let detection = self.detector.detect_from_stages(&stages)?;
        if let Some(dir) = self.debug_dir.clone() {
            self.dump_stage(&dir, "rectified.png", &detection.rectified.view());
            let mut overlay = RgbImage::from_gray(gray);
            draw_quad(&mut overlay, &detection.quad.corners, [0, 255, 0], 3);
            if let Err(err) = save_png(dir.join("located.png"), &overlay) {
                warn!("debug dump failed: {err}");
            }
        }

        let candidates = classify_cells(&mut self.model, &detection.cells);
        let readable = candidates.iter().filter(|c| !c.digits.is_empty()).count();
        info!("classified {} non-empty cells", readable);

        let board = solve_from_candidates(&candidates)?;
        let clues = (0..9)
            .flat_map(|r| (0..9).map(move |c| (r, c)))
            .filter(|&(r, c)| board.is_fixed(r, c))
            .count();
        info!("puzzle solved from {} clues", clues);

        let output = compose_solved_image(&detection.rectified.view(), &board);
        Ok(SolvedPuzzle {
            board,
            quad: detection.quad,
            rectified: detection.rectified,
            output,
        })
    }

    /// Full run from an input file to an output PNG.
    pub fn solve_photo(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<SolvedPuzzle, PipelineError> {
        let rgb = load_rgb(input.as_ref())?;
        info!(
            "loaded {} ({}x{})",
            input.as_ref().display(),
            rgb.width,
            rgb.height
        );
        let gray = rgb_to_gray(&rgb);
        let solved = self.solve_gray(&gray.view())?;
        save_png(output.as_ref(), &solved.output)?;
        info!("wrote {}", output.as_ref().display());
        Ok(solved)
    }

    fn dump_stage(&self, dir: &Path, name: &str, img: &GrayImageView<'_>) {
        if let Err(err) = save_gray_png(dir.join(name), img) {
            warn!("debug dump {name} failed: {err}");
        }
    }
}
