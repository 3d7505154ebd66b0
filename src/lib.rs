// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 textcat-eval contributors

//! Streaming evaluation for multi-label text classifiers
//!
//! This crate provides:
//! - K-fold partitioning of sample indices with complementary train sets
//! - Streaming (one-sample-at-a-time) train/test cycles over an abstract
//!   `Model` capability
//! - Multi-label scoring: set-overlap accuracy, winning-label selection
//!   with an explicit tie-break, confusion matrices with a "(none)"
//!   bucket and totals margins
//! - Cross-fold aggregation: max/mean/min accuracy, summed confusion
//!   matrix, optional expected-label accuracy
//! - Reference model implementations and a synthetic dataset for
//!   exercising the pipeline end to end

pub mod aggregate;
pub mod dataset;
pub mod error;
pub mod experiment;
pub mod model;
pub mod models;
pub mod partition;
pub mod report;
pub mod score;

pub use aggregate::{cumulative, expected_trial_accuracy, CumulativeResult};
pub use dataset::{
    label_distribution, load_csv, load_expected_csv, synthetic_dataset, tokenize, LabelReference,
    Sample, NONE_LABEL,
};
pub use error::{EvalError, Result};
pub use experiment::{
    test_streaming, train_streaming, Experiment, ExperimentConfig, ExperimentOutcome, Protocol,
};
pub use model::{EncodedSample, Model, Pattern};
pub use models::{BitmapConfig, BitmapOverlapModel, MajorityModel, RandomModel};
pub use partition::{Fold, FoldPartitioner};
pub use score::{
    sample_accuracy, score_trial, trial_accuracy, winning_labels, ConfusionMatrix,
    Misclassification, PredictionRecord, TrialResult,
};
