use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;
use log::{error, info, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;

use sudoku_scan::{sweep_grid, write_best_params, write_results_csv, SweepResult};
use sudoku_scan_cnn::{
    evaluate, generate_empty_samples, load_mnist, save_weights, train, Dataset, DigitCnn,
    TrainConfig,
};
use sudoku_scan_core::init_with_level;

/// Sweep trainer hyperparameters and record per-class metrics.
#[derive(Parser, Debug)]
#[command(name = "sudoku-scan-grid-search", version, about)]
struct Args {
    /// Directory holding the four MNIST IDX files.
    mnist_dir: PathBuf,

    /// Output directory for the CSV, best_params.txt, and optimized weights.
    out_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_datasets(args: &Args, rng: &mut StdRng) -> Result<(Dataset, Dataset), Box<dyn std::error::Error>> {
    let mut train_set = load_mnist(
        args.mnist_dir.join("train-images.idx3-ubyte"),
        args.mnist_dir.join("train-labels.idx1-ubyte"),
    )?;
    let mut test_set = load_mnist(
        args.mnist_dir.join("t10k-images.idx3-ubyte"),
        args.mnist_dir.join("t10k-labels.idx1-ubyte"),
    )?;
    let train_empty = train_set.count() / 9;
    let test_empty = test_set.count() / 9;
    generate_empty_samples(&mut train_set, train_empty, rng);
    generate_empty_samples(&mut test_set, test_empty, rng);
    Ok((train_set, test_set))
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::from_entropy();
    std::fs::create_dir_all(&args.out_dir)?;

    info!("loading datasets");
    let (mut train_set, test_set) = load_datasets(args, &mut rng)?;
    info!("{} train, {} test", train_set.count(), test_set.count());

    let grid = sweep_grid();
    info!("sweeping {} configurations", grid.len());

    let mut results: Vec<SweepResult> = Vec::with_capacity(grid.len());
    for (i, params) in grid.iter().enumerate() {
        info!(
            "configuration {}/{}: epochs={} batch={} lr={} momentum={}",
            i + 1,
            grid.len(),
            params.epochs,
            params.batch_size,
            params.learning_rate,
            params.momentum
        );

        let mut model = DigitCnn::new(&mut rng);
        let cfg = TrainConfig::from(*params);
        let started = Instant::now();
        train(&mut model, &mut train_set, &test_set, &cfg, &mut rng);
        let training_time_secs = started.elapsed().as_secs_f64();

        let report = evaluate(&mut model, &test_set);
        info!(
            "  accuracy {:.4}, macro-F1 {:.4}, {:.1} min",
            report.accuracy,
            report.avg_f1,
            training_time_secs / 60.0
        );

        results.push(SweepResult {
            params: *params,
            report,
            training_time_secs,
        });
    }

    results.sort_by(SweepResult::ranking);
    write_results_csv(args.out_dir.join("grid_search_results.csv"), &results)?;
    write_best_params(args.out_dir.join("best_params.txt"), &results[0])?;

    info!("top configurations:");
    for (rank, r) in results.iter().take(5).enumerate() {
        info!(
            "  #{} epochs={} batch={} lr={:.4} momentum={:.2} accuracy={:.4} f1={:.4}",
            rank + 1,
            r.params.epochs,
            r.params.batch_size,
            r.params.learning_rate,
            r.params.momentum,
            r.report.accuracy,
            r.report.avg_f1
        );
    }

    info!("retraining the winner for the optimized weights file");
    let best = &results[0];
    let mut final_model = DigitCnn::new(&mut rng);
    let cfg = TrainConfig::from(best.params);
    train(&mut final_model, &mut train_set, &test_set, &cfg, &mut rng);
    save_weights(&final_model, args.out_dir.join("cnn_weights_optimized.bin"))?;

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
