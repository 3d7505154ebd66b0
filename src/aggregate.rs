// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 textcat-eval contributors

//! Cross-fold aggregation of trial results
//!
//! Combines per-fold (accuracy, confusion matrix) pairs into cumulative
//! statistics, and computes the optional accuracy against an externally
//! supplied expected-label sequence.

use crate::dataset::{LabelReference, NONE_LABEL};
use crate::error::{EvalError, Result};
use crate::score::{ConfusionMatrix, PredictionRecord, TrialResult};
use serde::{Deserialize, Serialize};

/// Cumulative statistics over all folds of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CumulativeResult {
    pub max_accuracy: f64,
    pub mean_accuracy: f64,
    pub min_accuracy: f64,
    /// Element-wise sum of the per-fold confusion matrices.
    pub total_confusion: ConfusionMatrix,
    /// Mean accuracy against an external expected-label source, when one
    /// was supplied.
    pub expected_accuracy: Option<f64>,
}

/// Combine per-fold results into cumulative statistics.
///
/// Fold order does not matter; max/mean/min and the matrix sum are
/// order-insensitive.
pub fn cumulative(trials: &[TrialResult]) -> Result<CumulativeResult> {
    let first = trials.first().ok_or_else(|| {
        EvalError::invalid("cannot aggregate an empty trial sequence")
    })?;

    let mut max_accuracy = f64::MIN;
    let mut min_accuracy = f64::MAX;
    let mut sum = 0.0;
    let mut total_confusion = ConfusionMatrix::new(first.confusion.n_labels());

    for trial in trials {
        max_accuracy = max_accuracy.max(trial.accuracy);
        min_accuracy = min_accuracy.min(trial.accuracy);
        sum += trial.accuracy;
        total_confusion.merge(&trial.confusion)?;
    }

    Ok(CumulativeResult {
        max_accuracy,
        mean_accuracy: sum / trials.len() as f64,
        min_accuracy,
        total_confusion,
        expected_accuracy: None,
    })
}

/// Accuracy of one fold's top-1 predictions against externally supplied
/// expected label strings.
///
/// `expected` must be aligned with `records`: one expected string per
/// evaluated sample, in evaluation order. Each sample contributes 1.0
/// when its top predicted label (mapped back through the label
/// reference, or "(none)" for an empty prediction) equals the expected
/// string, else 0.0.
pub fn expected_trial_accuracy(
    records: &[PredictionRecord],
    expected: &[String],
    labels: &LabelReference,
) -> Result<f64> {
    if records.len() != expected.len() {
        return Err(EvalError::invalid(format!(
            "expected-label sequence has {} entries for {} evaluated samples",
            expected.len(),
            records.len()
        )));
    }
    if records.is_empty() {
        return Err(EvalError::invalid("no samples to compare against expectations"));
    }

    let mut matches = 0usize;
    for (record, want) in records.iter().zip(expected.iter()) {
        let got = record
            .predicted
            .first()
            .map_or(NONE_LABEL, |&idx| labels.name(idx));
        if got == want {
            matches += 1;
        }
    }
    Ok(matches as f64 / records.len() as f64)
}

/// Mean of per-fold expected accuracies.
pub fn mean_expected_accuracy(per_fold: &[f64]) -> Result<f64> {
    if per_fold.is_empty() {
        return Err(EvalError::invalid("no per-fold expected accuracies to average"));
    }
    Ok(per_fold.iter().sum::<f64>() / per_fold.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::score_trial;
    use crate::dataset::Sample;

    const EPS: f64 = 1e-9;

    fn trial(accuracy: f64, n_labels: usize) -> TrialResult {
        TrialResult {
            accuracy,
            confusion: ConfusionMatrix::new(n_labels),
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_cumulative_max_mean_min() {
        let trials = vec![trial(0.6, 2), trial(0.8, 2), trial(1.0, 2)];
        let result = cumulative(&trials).unwrap();
        assert!((result.max_accuracy - 1.0).abs() < EPS);
        assert!((result.mean_accuracy - 0.8).abs() < EPS);
        assert!((result.min_accuracy - 0.6).abs() < EPS);
        assert!(result.expected_accuracy.is_none());
    }

    #[test]
    fn test_cumulative_empty_is_error() {
        assert!(matches!(
            cumulative(&[]).unwrap_err(),
            EvalError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_cumulative_sums_confusion_matrices() {
        let samples = vec![Sample::new("a", vec![0]), Sample::new("b", vec![1])];
        let records = vec![
            PredictionRecord {
                predicted: vec![0],
                actual: vec![0],
            },
            PredictionRecord {
                predicted: vec![0],
                actual: vec![1],
            },
        ];
        let one = score_trial(&records, &[0, 1], &samples, 2).unwrap();
        let two = one.clone();

        let result = cumulative(&[one, two]).unwrap();
        assert_eq!(result.total_confusion.total(), 4);
        assert_eq!(result.total_confusion.get(0, 0), 2);
        assert_eq!(result.total_confusion.get(1, 0), 2);
    }

    #[test]
    fn test_cumulative_shape_mismatch_is_error() {
        let trials = vec![trial(0.5, 2), trial(0.5, 3)];
        assert!(matches!(
            cumulative(&trials).unwrap_err(),
            EvalError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_expected_trial_accuracy() {
        let labels = LabelReference::from_labels(["spam", "ham"]);
        let records = vec![
            PredictionRecord {
                predicted: vec![0, 1],
                actual: vec![0],
            },
            PredictionRecord {
                predicted: vec![1],
                actual: vec![0],
            },
            PredictionRecord {
                predicted: vec![],
                actual: vec![1],
            },
        ];
        // Top-1 strings: "spam", "ham", "(none)".
        let expected = vec![
            "spam".to_string(),
            "spam".to_string(),
            "(none)".to_string(),
        ];
        let accuracy = expected_trial_accuracy(&records, &expected, &labels).unwrap();
        assert!((accuracy - 2.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_expected_trial_accuracy_length_mismatch() {
        let labels = LabelReference::from_labels(["spam"]);
        let records = vec![PredictionRecord {
            predicted: vec![0],
            actual: vec![0],
        }];
        let err = expected_trial_accuracy(&records, &[], &labels).unwrap_err();
        assert!(matches!(err, EvalError::InvalidArgument(_)));
    }

    #[test]
    fn test_mean_expected_accuracy() {
        assert!((mean_expected_accuracy(&[0.5, 1.0]).unwrap() - 0.75).abs() < EPS);
        assert!(mean_expected_accuracy(&[]).is_err());
    }
}
