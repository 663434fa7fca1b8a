use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;
use log::{error, info, LevelFilter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sudoku_scan::TrainParams;
use sudoku_scan_cnn::{
    accuracy, generate_empty_samples, load_aux_digits_if_present, load_mnist, save_weights, train,
    DigitCnn, TrainConfig,
};
use sudoku_scan_core::init_with_level;

/// Train the digit classifier on MNIST plus synthetic empty cells.
#[derive(Parser, Debug)]
#[command(name = "sudoku-scan-train", version, about)]
struct Args {
    /// Directory holding the four MNIST IDX files.
    mnist_dir: PathBuf,

    /// Where to write the trained weights.
    output: PathBuf,

    /// Hyperparameter file; defaults are used when it does not exist.
    #[arg(long, default_value = "models/best_params.txt")]
    params: PathBuf,

    /// Directory searched for the auxiliary printed-digit datasets
    /// (digital_train.bin / digital_test.bin).
    #[arg(long, default_value = "data")]
    aux_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::from_entropy();

    info!("loading training dataset");
    let mut train_set = load_mnist(
        args.mnist_dir.join("train-images.idx3-ubyte"),
        args.mnist_dir.join("train-labels.idx1-ubyte"),
    )?;
    info!("loading validation dataset");
    let mut test_set = load_mnist(
        args.mnist_dir.join("t10k-images.idx3-ubyte"),
        args.mnist_dir.join("t10k-labels.idx1-ubyte"),
    )?;

    load_aux_digits_if_present(args.aux_dir.join("digital_train.bin"), &mut train_set);
    load_aux_digits_if_present(args.aux_dir.join("digital_test.bin"), &mut test_set);

    // aim for roughly 10% empty-cell samples so class 0 is well represented
    let train_empty = train_set.count() / 9;
    let test_empty = test_set.count() / 9;
    info!("generating {} + {} empty-cell samples", train_empty, test_empty);
    generate_empty_samples(&mut train_set, train_empty, &mut rng);
    generate_empty_samples(&mut test_set, test_empty, &mut rng);

    info!(
        "dataset ready: {} train, {} validation",
        train_set.count(),
        test_set.count()
    );

    let params = TrainParams::load_or_default(&args.params)?;
    let cfg = TrainConfig::from(params);

    let mut model = DigitCnn::new(&mut rng);
    let started = Instant::now();
    let outcome = train(&mut model, &mut train_set, &test_set, &cfg, &mut rng);
    let elapsed = started.elapsed().as_secs_f64();

    info!(
        "training finished in {:.1}s over {} epochs (best accuracy {:.4}{})",
        elapsed,
        outcome.epochs_run,
        outcome.best_accuracy,
        if outcome.stopped_early {
            ", stopped early"
        } else {
            ""
        }
    );

    save_weights(&model, &args.output)?;

    let final_accuracy = accuracy(&mut model, &test_set);
    info!("final validation accuracy: {:.4}", final_accuracy);

    info!("spot check on 10 random validation samples:");
    for _ in 0..10 {
        let idx = rng.gen_range(0..test_set.count());
        let predicted = model.predict(&test_set.images[idx]);
        let actual = test_set.labels[idx];
        let mark = if predicted == actual { "ok " } else { "MISS" };
        info!("  [{mark}] sample {idx}: predicted {predicted}, actual {actual}");
    }

    info!("weights written to {}", args.output.display());
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
