// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 textcat-eval contributors

//! Classifier evaluation CLI
//!
//! Usage:
//!   textcat-eval --synthetic 200 -k 5
//!   textcat-eval --data responses.csv -k 5 --model bitmap
//!   textcat-eval --data responses.csv --test --model majority

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use textcat_eval::report::{cumulative_report, error_report, save_outcome};
use textcat_eval::{
    label_distribution, load_csv, load_expected_csv, synthetic_dataset, BitmapOverlapModel,
    Experiment, ExperimentConfig, LabelReference, MajorityModel, Model, Protocol, RandomModel,
    Sample,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "textcat-eval")]
#[command(about = "Evaluate a multi-label text classifier with k-fold cross-validation")]
#[command(version)]
struct Args {
    /// CSV data file: text in the first column, labels in the rest
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// CSV file with one expected label string per sample position
    #[arg(short, long)]
    expected: Option<PathBuf>,

    /// Generate a synthetic dataset of this many samples instead
    #[arg(long, default_value_t = 0)]
    synthetic: usize,

    /// Number of cross-validation folds; k=1 runs no cross-validation
    #[arg(short, long, default_value_t = 5)]
    k_folds: usize,

    /// Train on all the data (requires k=1)
    #[arg(long)]
    train: bool,

    /// Test on all the data (requires k=1)
    #[arg(long)]
    test: bool,

    /// Model to evaluate (random, majority, bitmap)
    #[arg(short, long, default_value = "bitmap")]
    model: String,

    /// Seed for shuffling and model randomness
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Shuffle sample indices before partitioning
    #[arg(long, default_value_t = true)]
    randomize: bool,

    /// Write the run outcome as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 0 = results only, 1 = per-trial reports
    #[arg(long, default_value_t = 1)]
    verbosity: u8,
}

fn build_model(name: &str, n_labels: usize, seed: u64) -> Result<Box<dyn Model>> {
    match name {
        "random" => Ok(Box::new(RandomModel::new(n_labels, seed))),
        "majority" => Ok(Box::new(MajorityModel::new(n_labels))),
        "bitmap" => Ok(Box::new(BitmapOverlapModel::new(n_labels))),
        other => bail!("unknown model '{other}'; expected random, majority, or bitmap"),
    }
}

fn load_data(args: &Args) -> Result<(Vec<Sample>, LabelReference)> {
    if let Some(ref path) = args.data {
        load_csv(path)
    } else if args.synthetic > 0 {
        tracing::info!(
            "generating synthetic dataset ({} samples, seed={})",
            args.synthetic,
            args.seed
        );
        Ok(synthetic_dataset(args.synthetic, args.seed))
    } else {
        bail!("no data source: pass --data <file> or --synthetic <n>")
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let (samples, labels) = load_data(&args)?;
    println!("Loaded {} samples, {} distinct labels", samples.len(), labels.len());

    let dist = label_distribution(&samples);
    let mut by_label: Vec<_> = dist.iter().collect();
    by_label.sort_by_key(|(label, _)| **label);
    for (label, count) in by_label {
        println!("  {}: {}", labels.name(*label), count);
    }

    let expected = match args.expected {
        Some(ref path) => Some(load_expected_csv(path)?),
        None => None,
    };

    let protocol = Protocol::from_flags(args.train, args.test, args.k_folds)?;
    let config = ExperimentConfig {
        protocol,
        randomize: args.randomize,
        seed: Some(args.seed),
        verbosity: args.verbosity,
    };

    let model = build_model(&args.model, labels.len(), args.seed)?;
    tracing::info!("running {:?} with model '{}'", protocol, model.name());

    let mut experiment = Experiment::new(config, model)?;
    let outcome = experiment.run(&samples, &labels, expected.as_deref())?;

    match protocol {
        Protocol::TrainAll => {
            println!("\nTrained on all {} samples.", samples.len());
        }
        Protocol::TestAll => {
            let trial = &outcome.trials[0];
            println!("\nTest accuracy: {:.3}", trial.accuracy);
            println!("{}", error_report(trial, &labels));
            println!("{}", trial.confusion.render(&labels));
        }
        Protocol::KFold(k) => {
            let cumulative = outcome
                .cumulative
                .as_ref()
                .expect("k-fold run always produces cumulative results");
            println!("\nCross-validation over {k} folds:");
            println!("{}", cumulative_report(cumulative, &labels));
            for (i, trial) in outcome.trials.iter().enumerate() {
                println!("Fold {i}: accuracy {:.3}", trial.accuracy);
                print!("{}", error_report(trial, &labels));
            }
        }
    }

    if let Some(ref path) = args.output {
        save_outcome(&outcome, path)?;
        println!("\nResults saved to {}", path.display());
    }

    Ok(())
}
