//! Trainer hyperparameters: the `best_params.txt` format and the grid
//! search result table.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use log::info;
use sudoku_scan_cnn::{EvalReport, TrainConfig, NUM_CLASSES};

#[derive(thiserror::Error, Debug)]
pub enum ParamsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed line {line} in params file: {content:?}")]
    Malformed { line: usize, content: String },
}

/// Hyperparameters as stored in `best_params.txt`.
///
/// The file is plain `KEY=value` text; `#` lines and blank lines are
/// comments, unknown keys are ignored so the metrics block written by the
/// grid search can live in the same file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub momentum: f32,
}

impl Default for TrainParams {
    fn default() -> Self {
        let cfg = TrainConfig::default();
        Self {
            epochs: cfg.epochs,
            batch_size: cfg.batch_size,
            learning_rate: cfg.learning_rate,
            momentum: cfg.momentum,
        }
    }
}

impl From<TrainParams> for TrainConfig {
    fn from(p: TrainParams) -> Self {
        Self {
            epochs: p.epochs,
            batch_size: p.batch_size,
            learning_rate: p.learning_rate,
            momentum: p.momentum,
        }
    }
}

impl TrainParams {
    /// Parse a params file, starting from defaults for any missing key.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let mut params = Self::default();

        for (n, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ParamsError::Malformed {
                    line: n + 1,
                    content: line.to_string(),
                });
            };
            let value = value.trim();
            match key.trim() {
                "EPOCHS" => params.epochs = parse_field(n, value)?,
                "BATCH_SIZE" => params.batch_size = parse_field(n, value)?,
                "LEARNING_RATE" => params.learning_rate = parse_field(n, value)?,
                "MOMENTUM" => params.momentum = parse_field(n, value)?,
                _ => {} // metrics and future keys
            }
        }

        info!(
            "params: epochs={} batch={} lr={} momentum={}",
            params.epochs, params.batch_size, params.learning_rate, params.momentum
        );
        Ok(params)
    }

    /// Load the params file when it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            info!("no params file, using defaults");
            Ok(Self::default())
        }
    }
}

fn parse_field<T: std::str::FromStr>(line: usize, value: &str) -> Result<T, ParamsError> {
    value.parse().map_err(|_| ParamsError::Malformed {
        line: line + 1,
        content: value.to_string(),
    })
}

/// One grid-search configuration with its measured metrics.
#[derive(Clone, Debug)]
pub struct SweepResult {
    pub params: TrainParams,
    pub report: EvalReport,
    pub training_time_secs: f64,
}

impl SweepResult {
    /// Sort key: macro-F1 first, accuracy as tie break, best first.
    pub fn ranking(a: &Self, b: &Self) -> std::cmp::Ordering {
        b.report
            .avg_f1
            .total_cmp(&a.report.avg_f1)
            .then(b.report.accuracy.total_cmp(&a.report.accuracy))
    }
}

/// Write `grid_search_results.csv` with per-class metric columns.
pub fn write_results_csv(
    path: impl AsRef<Path>,
    results: &[SweepResult],
) -> Result<(), ParamsError> {
    let mut out = String::new();
    out.push_str("epochs,batch_size,learning_rate,momentum,accuracy,avg_f1_score,training_time");
    for i in 0..NUM_CLASSES {
        let _ = write!(out, ",precision_{i},recall_{i},f1_{i}");
    }
    out.push('\n');

    for r in results {
        let _ = write!(
            out,
            "{},{},{:.4},{:.2},{:.4},{:.4},{:.2}",
            r.params.epochs,
            r.params.batch_size,
            r.params.learning_rate,
            r.params.momentum,
            r.report.accuracy,
            r.report.avg_f1,
            r.training_time_secs
        );
        for i in 0..NUM_CLASSES {
            let _ = write!(
                out,
                ",{:.4},{:.4},{:.4}",
                r.report.precision[i], r.report.recall[i], r.report.f1[i]
            );
        }
        out.push('\n');
    }

    fs::write(path.as_ref(), out)?;
    info!("wrote {}", path.as_ref().display());
    Ok(())
}

/// Write `best_params.txt` for the winning configuration.
pub fn write_best_params(path: impl AsRef<Path>, best: &SweepResult) -> Result<(), ParamsError> {
    let mut out = String::new();
    out.push_str("# Best hyperparameters found by grid search\n\n");
    let _ = writeln!(out, "EPOCHS={}", best.params.epochs);
    let _ = writeln!(out, "BATCH_SIZE={}", best.params.batch_size);
    let _ = writeln!(out, "LEARNING_RATE={:.4}", best.params.learning_rate);
    let _ = writeln!(out, "MOMENTUM={:.2}", best.params.momentum);
    out.push_str("\n# Metrics for this configuration\n");
    let _ = writeln!(out, "ACCURACY={:.4}", best.report.accuracy);
    let _ = writeln!(out, "AVG_F1_SCORE={:.4}", best.report.avg_f1);
    let _ = writeln!(
        out,
        "TRAINING_TIME_MIN={:.2}",
        best.training_time_secs / 60.0
    );

    fs::write(path.as_ref(), out)?;
    info!("wrote {}", path.as_ref().display());
    Ok(())
}

/// The hyperparameter grid the sweep walks.
pub fn sweep_grid() -> Vec<TrainParams> {
    let epochs = [20usize];
    let batch_sizes = [32usize];
    let learning_rates = [0.005f32, 0.01, 0.02];
    let momentums = [0.0f32, 0.9];

    let mut grid = Vec::new();
    for &e in &epochs {
        for &b in &batch_sizes {
            for &lr in &learning_rates {
                for &m in &momentums {
                    grid.push(TrainParams {
                        epochs: e,
                        batch_size: b,
                        learning_rate: lr,
                        momentum: m,
                    });
                }
            }
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn report_with(accuracy: f32, avg_f1: f32) -> EvalReport {
        EvalReport {
            accuracy,
            avg_f1,
            precision: [0.0; NUM_CLASSES],
            recall: [0.0; NUM_CLASSES],
            f1: [0.0; NUM_CLASSES],
            confusion: [[0; NUM_CLASSES]; NUM_CLASSES],
        }
    }

    #[test]
    fn params_round_trip_through_best_params_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best_params.txt");
        let best = SweepResult {
            params: TrainParams {
                epochs: 20,
                batch_size: 32,
                learning_rate: 0.02,
                momentum: 0.9,
            },
            report: report_with(0.97, 0.96),
            training_time_secs: 120.0,
        };
        write_best_params(&path, &best).unwrap();

        let loaded = TrainParams::load(&path).unwrap();
        assert_eq!(loaded.epochs, 20);
        assert_eq!(loaded.batch_size, 32);
        assert_abs_diff_eq!(loaded.learning_rate, 0.02, epsilon = 1e-6);
        assert_abs_diff_eq!(loaded.momentum, 0.9, epsilon = 1e-6);
    }

    #[test]
    fn comments_and_unknown_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.txt");
        fs::write(&path, "# comment\n\nEPOCHS=7\nACCURACY=0.99\nWHATEVER=x\n").unwrap();
        let loaded = TrainParams::load(&path).unwrap();
        assert_eq!(loaded.epochs, 7);
        assert_eq!(loaded.batch_size, TrainParams::default().batch_size);
    }

    #[test]
    fn garbage_line_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.txt");
        fs::write(&path, "EPOCHS ten\n").unwrap();
        assert!(matches!(
            TrainParams::load(&path),
            Err(ParamsError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let loaded = TrainParams::load_or_default("/nope/params.txt").unwrap();
        assert_eq!(loaded, TrainParams::default());
    }

    #[test]
    fn csv_has_header_and_one_row_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid_search_results.csv");
        let results = vec![
            SweepResult {
                params: TrainParams::default(),
                report: report_with(0.9, 0.89),
                training_time_secs: 60.0,
            },
            SweepResult {
                params: TrainParams::default(),
                report: report_with(0.8, 0.79),
                training_time_secs: 30.0,
            },
        ];
        write_results_csv(&path, &results).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(
            "epochs,batch_size,learning_rate,momentum,accuracy,avg_f1_score,training_time"
        ));
        assert!(lines[0].ends_with("precision_9,recall_9,f1_9"));
        // header and rows have the same column count
        let cols = lines[0].split(',').count();
        assert_eq!(cols, 7 + 30);
        assert!(lines[1..].iter().all(|l| l.split(',').count() == cols));
    }

    #[test]
    fn ranking_prefers_f1_then_accuracy() {
        let a = SweepResult {
            params: TrainParams::default(),
            report: report_with(0.99, 0.90),
            training_time_secs: 0.0,
        };
        let b = SweepResult {
            params: TrainParams::default(),
            report: report_with(0.80, 0.95),
            training_time_secs: 0.0,
        };
        let mut v = vec![a, b];
        v.sort_by(SweepResult::ranking);
        assert_abs_diff_eq!(v[0].report.avg_f1, 0.95, epsilon = 1e-6);
    }

    #[test]
    fn sweep_grid_is_the_documented_cartesian_product() {
        let grid = sweep_grid();
        assert_eq!(grid.len(), 6);
        assert!(grid.iter().all(|p| p.epochs == 20 && p.batch_size == 32));
    }
}
