// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 textcat-eval contributors

//! Experiment orchestration
//!
//! Sequences encoding, fold partitioning, streaming train/test cycles,
//! scoring, and aggregation under one of three mutually exclusive
//! protocols: train on everything, test on everything, or k-fold
//! cross-validation. Everything runs single-threaded and synchronously;
//! a failing model call aborts the whole run because partial model
//! state is not safely resumable mid-fold.

use crate::aggregate::{
    cumulative, expected_trial_accuracy, mean_expected_accuracy, CumulativeResult,
};
use crate::dataset::{check_expected_len, LabelReference, Sample};
use crate::error::EvalError;
use crate::model::{EncodedSample, Model};
use crate::partition::FoldPartitioner;
use crate::report::trial_report;
use crate::score::{score_trial, PredictionRecord, TrialResult};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// The evaluation protocol for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    /// Stream every sample through training; no testing.
    TrainAll,
    /// Stream every sample through testing with the model as-is.
    TestAll,
    /// k-fold cross-validation, k > 1.
    KFold(usize),
}

impl Protocol {
    /// Resolve command-line style flags into a single protocol.
    ///
    /// Exactly one of train / test / k-fold (k > 1) may be requested;
    /// anything else is a configuration error.
    pub fn from_flags(train: bool, test: bool, k: usize) -> crate::error::Result<Self> {
        if k < 1 {
            return Err(EvalError::invalid("fold count k must be at least 1"));
        }
        if k > 1 && (train || test) {
            return Err(EvalError::invalid(
                "a run does either k-fold cross-validation or train/test, not both",
            ));
        }
        if train && test {
            return Err(EvalError::invalid(
                "train-all and test-all are mutually exclusive",
            ));
        }
        if k > 1 {
            Ok(Protocol::KFold(k))
        } else if train {
            Ok(Protocol::TrainAll)
        } else if test {
            Ok(Protocol::TestAll)
        } else {
            Err(EvalError::invalid(
                "no protocol selected: pass --train, --test, or k > 1",
            ))
        }
    }
}

/// Immutable configuration for one experiment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub protocol: Protocol,
    /// Shuffle indices before k-fold partitioning.
    pub randomize: bool,
    /// Shuffle seed; `None` draws from entropy (documented
    /// non-determinism).
    pub seed: Option<u64>,
    /// 0 = results only; 1 = per-trial reports.
    pub verbosity: u8,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::KFold(5),
            randomize: true,
            seed: Some(42),
            verbosity: 1,
        }
    }
}

impl ExperimentConfig {
    /// Reject configurations the orchestrator cannot run.
    pub fn validate(&self) -> crate::error::Result<()> {
        if let Protocol::KFold(k) = self.protocol {
            if k <= 1 {
                return Err(EvalError::invalid(
                    "k-fold protocol requires k greater than 1",
                ));
            }
        }
        Ok(())
    }
}

/// Terminal output of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentOutcome {
    pub protocol: Protocol,
    /// One result per evaluated fold; empty for train-all.
    pub trials: Vec<TrialResult>,
    /// Present for k-fold runs.
    pub cumulative: Option<CumulativeResult>,
    pub timestamp: DateTime<Utc>,
}

/// Stream training samples into the model one at a time, in input order.
pub fn train_streaming<M: Model>(model: &mut M, set: &[&EncodedSample]) -> Result<()> {
    for sample in set {
        model
            .train(&sample.pattern, &sample.labels)
            .context("model training failed")?;
    }
    Ok(())
}

/// Stream test samples through the model one at a time, asking for as
/// many labels as each sample actually has, and pair each prediction
/// with its gold labels in input order.
pub fn test_streaming<M: Model>(
    model: &M,
    set: &[&EncodedSample],
) -> Result<Vec<PredictionRecord>> {
    let mut records = Vec::with_capacity(set.len());
    for sample in set {
        let predicted = model
            .test(&sample.pattern, sample.labels.len())
            .context("model inference failed")?;
        records.push(PredictionRecord {
            predicted,
            actual: sample.labels.clone(),
        });
    }
    Ok(records)
}

/// Drives a model through the configured protocol.
pub struct Experiment<M: Model> {
    config: ExperimentConfig,
    model: M,
}

impl<M: Model> Experiment<M> {
    /// Create an experiment; fails on an invalid configuration.
    pub fn new(config: ExperimentConfig, model: M) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, model })
    }

    /// Access the model (e.g. to inspect state after a train-all run).
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Run the configured protocol over `samples`.
    ///
    /// `expected` optionally supplies one expected label string per
    /// sample position for the expected-accuracy comparison (k-fold
    /// only).
    pub fn run(
        &mut self,
        samples: &[Sample],
        labels: &LabelReference,
        expected: Option<&[String]>,
    ) -> Result<ExperimentOutcome> {
        if let Some(expected) = expected {
            check_expected_len(expected, samples.len())?;
        }

        let encode_start = Instant::now();
        let encoded: Vec<EncodedSample> = samples
            .iter()
            .map(|s| {
                self.model.encode(&s.tokens).map(|pattern| EncodedSample {
                    pattern,
                    labels: s.labels.clone(),
                })
            })
            .collect::<Result<_>>()
            .context("sample encoding failed")?;
        tracing::info!(
            "encoded {} samples in {:.2?}",
            encoded.len(),
            encode_start.elapsed()
        );

        let (trials, cumulative) = match self.config.protocol {
            Protocol::TrainAll => {
                tracing::info!("training on all {} samples", encoded.len());
                let all: Vec<&EncodedSample> = encoded.iter().collect();
                train_streaming(&mut self.model, &all)?;
                (Vec::new(), None)
            }
            Protocol::TestAll => {
                tracing::info!("testing on all {} samples", encoded.len());
                let all: Vec<&EncodedSample> = encoded.iter().collect();
                let records = test_streaming(&self.model, &all)?;
                let indices: Vec<usize> = (0..encoded.len()).collect();
                self.report_trial(&records, &indices, labels);
                let trial = score_trial(&records, &indices, samples, labels.len())?;
                (vec![trial], None)
            }
            Protocol::KFold(k) => self.run_kfold(k, samples, &encoded, labels, expected)?,
        };

        Ok(ExperimentOutcome {
            protocol: self.config.protocol,
            trials,
            cumulative,
            timestamp: Utc::now(),
        })
    }

    fn run_kfold(
        &mut self,
        k: usize,
        samples: &[Sample],
        encoded: &[EncodedSample],
        labels: &LabelReference,
        expected: Option<&[String]>,
    ) -> Result<(Vec<TrialResult>, Option<CumulativeResult>)> {
        let mut partitioner = FoldPartitioner::new(k);
        if self.config.randomize {
            partitioner = partitioner.randomized();
            if let Some(seed) = self.config.seed {
                partitioner = partitioner.with_seed(seed);
            }
        }
        let indices: Vec<usize> = (0..encoded.len()).collect();
        let folds = partitioner.split(&indices)?;

        let mut trials = Vec::with_capacity(k);
        let mut expected_per_fold = Vec::new();

        for (fold_idx, fold) in folds.iter().enumerate() {
            tracing::info!(
                "fold {}/{}: {} train, {} eval",
                fold_idx + 1,
                k,
                fold.train.len(),
                fold.eval.len()
            );
            let fold_start = Instant::now();

            // No fold's model state persists into the next.
            self.model.reset();

            let train_set: Vec<&EncodedSample> = fold.train.iter().map(|&i| &encoded[i]).collect();
            let eval_set: Vec<&EncodedSample> = fold.eval.iter().map(|&i| &encoded[i]).collect();

            train_streaming(&mut self.model, &train_set)?;
            let records = test_streaming(&self.model, &eval_set)?;

            self.report_trial(&records, &fold.eval, labels);

            if let Some(expected) = expected {
                let fold_expected: Vec<String> =
                    fold.eval.iter().map(|&i| expected[i].clone()).collect();
                expected_per_fold.push(expected_trial_accuracy(&records, &fold_expected, labels)?);
            }

            let trial = score_trial(&records, &fold.eval, samples, labels.len())?;
            tracing::info!(
                "fold {} accuracy {:.3} ({} errors) in {:.2?}",
                fold_idx + 1,
                trial.accuracy,
                trial.errors.len(),
                fold_start.elapsed()
            );
            trials.push(trial);
        }

        let mut result = cumulative(&trials)?;
        if !expected_per_fold.is_empty() {
            result.expected_accuracy = Some(mean_expected_accuracy(&expected_per_fold)?);
        }

        Ok((trials, Some(result)))
    }

    fn report_trial(
        &self,
        records: &[PredictionRecord],
        eval_indices: &[usize],
        labels: &LabelReference,
    ) {
        if self.config.verbosity > 0 {
            tracing::info!("\n{}", trial_report(records, eval_indices, labels));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic_dataset;
    use crate::model::Pattern;
    use crate::models::{BitmapOverlapModel, MajorityModel};

    #[test]
    fn test_protocol_from_flags() {
        assert_eq!(Protocol::from_flags(true, false, 1).unwrap(), Protocol::TrainAll);
        assert_eq!(Protocol::from_flags(false, true, 1).unwrap(), Protocol::TestAll);
        assert_eq!(Protocol::from_flags(false, false, 5).unwrap(), Protocol::KFold(5));

        assert!(Protocol::from_flags(true, true, 1).is_err());
        assert!(Protocol::from_flags(true, false, 3).is_err());
        assert!(Protocol::from_flags(false, true, 3).is_err());
        assert!(Protocol::from_flags(false, false, 1).is_err());
        assert!(Protocol::from_flags(false, false, 0).is_err());
    }

    #[test]
    fn test_config_validation_rejects_degenerate_kfold() {
        let config = ExperimentConfig {
            protocol: Protocol::KFold(1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(Experiment::new(config, MajorityModel::new(2)).is_err());
    }

    /// Test double that records every capability call it receives.
    struct RecordingModel {
        trained: Vec<(String, Vec<usize>)>,
        test_calls: std::cell::Cell<usize>,
        resets: usize,
    }

    impl RecordingModel {
        fn new() -> Self {
            Self {
                trained: Vec::new(),
                test_calls: std::cell::Cell::new(0),
                resets: 0,
            }
        }
    }

    impl Model for RecordingModel {
        fn name(&self) -> &str {
            "recording"
        }

        fn reset(&mut self) {
            self.resets += 1;
        }

        fn encode(&mut self, tokens: &[String]) -> anyhow::Result<Pattern> {
            Ok(Pattern {
                text: tokens.join(" "),
                bitmap: Vec::new(),
                sparsity: 0.0,
            })
        }

        fn train(&mut self, pattern: &Pattern, labels: &[usize]) -> anyhow::Result<()> {
            self.trained.push((pattern.text.clone(), labels.to_vec()));
            Ok(())
        }

        fn test(&self, _pattern: &Pattern, _num_labels: usize) -> anyhow::Result<Vec<usize>> {
            self.test_calls.set(self.test_calls.get() + 1);
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_train_all_streams_in_order_without_testing() {
        let samples = vec![
            Sample::new("alpha one", vec![0]),
            Sample::new("beta two", vec![1, 0]),
            Sample::new("gamma three", vec![1]),
        ];
        let labels = LabelReference::from_labels(["a", "b"]);

        let config = ExperimentConfig {
            protocol: Protocol::TrainAll,
            ..Default::default()
        };
        let mut experiment = Experiment::new(config, RecordingModel::new()).unwrap();
        let outcome = experiment.run(&samples, &labels, None).unwrap();

        assert!(outcome.trials.is_empty());
        assert!(outcome.cumulative.is_none());

        let model = experiment.model();
        assert_eq!(model.resets, 0);
        assert_eq!(model.test_calls.get(), 0);
        assert_eq!(model.trained.len(), 3);
        // Input order, full label sets.
        assert_eq!(model.trained[0], ("alpha one".to_string(), vec![0]));
        assert_eq!(model.trained[1], ("beta two".to_string(), vec![1, 0]));
        assert_eq!(model.trained[2], ("gamma three".to_string(), vec![1]));
    }

    #[test]
    fn test_kfold_resets_between_folds_and_aggregates() {
        let (samples, labels) = synthetic_dataset(40, 9);
        let config = ExperimentConfig {
            protocol: Protocol::KFold(4),
            randomize: true,
            seed: Some(9),
            verbosity: 0,
        };
        let mut experiment = Experiment::new(config, MajorityModel::new(labels.len())).unwrap();
        let outcome = experiment.run(&samples, &labels, None).unwrap();

        assert_eq!(outcome.trials.len(), 4);
        let cumulative = outcome.cumulative.unwrap();
        assert!(cumulative.min_accuracy <= cumulative.mean_accuracy);
        assert!(cumulative.mean_accuracy <= cumulative.max_accuracy);
        assert!(cumulative.max_accuracy <= 1.0);
        assert!(cumulative.min_accuracy >= 0.0);
        // Every sample is evaluated exactly once.
        assert_eq!(cumulative.total_confusion.total() as usize, samples.len());
    }

    #[test]
    fn test_kfold_overlap_model_beats_nothing_trained() {
        // The overlap model memorizes training bitmaps; with distinct
        // texts per fold it still predicts via category overlap, and the
        // run must produce a well-formed outcome.
        let (samples, labels) = synthetic_dataset(30, 5);
        let config = ExperimentConfig {
            protocol: Protocol::KFold(3),
            randomize: false,
            seed: None,
            verbosity: 0,
        };
        let model = BitmapOverlapModel::new(labels.len());
        let mut experiment = Experiment::new(config, model).unwrap();
        let outcome = experiment.run(&samples, &labels, None).unwrap();

        for trial in &outcome.trials {
            assert!(trial.accuracy >= 0.0 && trial.accuracy <= 1.0);
        }
    }

    #[test]
    fn test_kfold_with_expected_labels() {
        let (samples, labels) = synthetic_dataset(20, 3);
        // Expect the first gold label of every sample; top-1 equality.
        let expected: Vec<String> = samples
            .iter()
            .map(|s| labels.name(s.labels[0]).to_string())
            .collect();

        let config = ExperimentConfig {
            protocol: Protocol::KFold(2),
            randomize: false,
            seed: None,
            verbosity: 0,
        };
        let mut experiment = Experiment::new(config, MajorityModel::new(labels.len())).unwrap();
        let outcome = experiment.run(&samples, &labels, Some(&expected)).unwrap();

        let accuracy = outcome.cumulative.unwrap().expected_accuracy.unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn test_expected_length_mismatch_aborts_run() {
        let (samples, labels) = synthetic_dataset(10, 3);
        let expected = vec!["billing".to_string(); 7];

        let config = ExperimentConfig {
            protocol: Protocol::KFold(2),
            verbosity: 0,
            ..Default::default()
        };
        let mut experiment = Experiment::new(config, MajorityModel::new(labels.len())).unwrap();
        assert!(experiment.run(&samples, &labels, Some(&expected)).is_err());
    }

    #[test]
    fn test_test_all_scores_untrained_model_as_zero() {
        let samples = vec![Sample::new("one", vec![0]), Sample::new("two", vec![1])];
        let labels = LabelReference::from_labels(["a", "b"]);

        let config = ExperimentConfig {
            protocol: Protocol::TestAll,
            verbosity: 0,
            ..Default::default()
        };
        let mut experiment =
            Experiment::new(config, MajorityModel::new(labels.len())).unwrap();
        let outcome = experiment.run(&samples, &labels, None).unwrap();

        assert_eq!(outcome.trials.len(), 1);
        let trial = &outcome.trials[0];
        // Untrained majority model predicts nothing: zero accuracy, all
        // samples in the "(none)" column.
        assert!(trial.accuracy.abs() < 1e-9);
        assert_eq!(trial.confusion.get(0, 2), 1);
        assert_eq!(trial.confusion.get(1, 2), 1);
    }
}
