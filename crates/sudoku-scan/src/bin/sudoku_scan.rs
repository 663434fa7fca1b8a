use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::Parser;
use log::{error, LevelFilter};

use sudoku_scan::{Pipeline, ScanReport};
use sudoku_scan_core::init_with_level;
use sudoku_scan_grid::GridDetectorParams;

/// Solve a photographed Sudoku puzzle and write the result as PNG.
#[derive(Parser, Debug)]
#[command(name = "sudoku-scan", version, about)]
struct Args {
    /// Input photograph (PNG/JPEG/BMP).
    input: PathBuf,

    /// Output PNG with the solved digits rendered in red.
    output: PathBuf,

    /// Classifier weights file.
    #[arg(long, default_value = "models/cnn_weights.bin")]
    weights: PathBuf,

    /// Dump intermediate stage images into this directory.
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Write a JSON run report to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut report = ScanReport::new(args.input.display().to_string());

    let mut pipeline = Pipeline::from_weights(&args.weights, GridDetectorParams::default())?;
    if let Some(dir) = &args.debug_dir {
        std::fs::create_dir_all(dir)?;
        pipeline = pipeline.with_debug_dir(dir);
    }

    let result = pipeline.solve_photo(&args.input, &args.output);
    match &result {
        Ok(solved) => report.set_solved(solved),
        Err(err) => report.set_error(err),
    }
    if let Some(path) = &args.report {
        report.write_json(path)?;
    }

    let solved = result?;
    println!("{}", solved.board);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = LevelFilter::from_str(&args.log_level).unwrap_or(LevelFilter::Info);
    let _ = init_with_level(level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
