// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 textcat-eval contributors

//! Human-readable reports and JSON persistence of run outcomes

use crate::aggregate::CumulativeResult;
use crate::dataset::{LabelReference, NONE_LABEL};
use crate::experiment::ExperimentOutcome;
use crate::score::{PredictionRecord, TrialResult};
use anyhow::{Context, Result};
use std::path::Path;

fn label_names(indices: &[usize], labels: &LabelReference) -> String {
    if indices.is_empty() {
        return NONE_LABEL.to_string();
    }
    indices
        .iter()
        .map(|&i| labels.name(i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Columnar actual-vs-predicted table for one trial.
pub fn trial_report(
    records: &[PredictionRecord],
    eval_indices: &[usize],
    labels: &LabelReference,
) -> String {
    let mut out = String::from("Evaluation results for the trial:\n");
    out.push_str(&format!("{:<10}|{:<40}|{:<40}\n", "#", "Actual", "Predicted"));
    for (record, idx) in records.iter().zip(eval_indices.iter()) {
        out.push_str(&format!(
            "{:<10}|{:<40}|{:<40}\n",
            idx,
            label_names(&record.actual, labels),
            label_names(&record.predicted, labels),
        ));
    }
    out
}

/// Per-fold misclassification listing for diagnostic display.
pub fn error_report(trial: &TrialResult, labels: &LabelReference) -> String {
    if trial.errors.is_empty() {
        return "No misclassified samples.\n".to_string();
    }
    let mut out = format!("{} misclassified samples:\n", trial.errors.len());
    for error in &trial.errors {
        out.push_str(&format!(
            "  #{} ({:.2}): actual [{}], predicted [{}]: {}\n",
            error.sample_index,
            error.accuracy,
            label_names(&error.actual, labels),
            label_names(&error.predicted, labels),
            error.text,
        ));
    }
    out
}

/// Cumulative statistics block, matching the classic results printout.
pub fn cumulative_report(result: &CumulativeResult, labels: &LabelReference) -> String {
    let mut out = String::from("---------- RESULTS ----------\n");
    out.push_str(&format!(
        "max, mean, min accuracies = {:.3}, {:.3}, {:.3}\n",
        result.max_accuracy, result.mean_accuracy, result.min_accuracy
    ));
    if let Some(expected) = result.expected_accuracy {
        out.push_str(&format!(
            "mean accuracy against expected labels = {expected:.3}\n"
        ));
    }
    out.push_str("total confusion matrix =\n");
    out.push_str(&result.total_confusion.render(labels));
    out
}

/// Save a run outcome as pretty-printed JSON.
pub fn save_outcome(outcome: &ExperimentOutcome, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(outcome)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write results to {}", path.display()))?;
    tracing::info!("results saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Sample;
    use crate::experiment::Protocol;
    use crate::score::score_trial;

    fn fixture() -> (Vec<PredictionRecord>, LabelReference, Vec<Sample>) {
        let labels = LabelReference::from_labels(["spam", "ham"]);
        let samples = vec![Sample::new("first text", vec![0]), Sample::new("second text", vec![1])];
        let records = vec![
            PredictionRecord {
                predicted: vec![0],
                actual: vec![0],
            },
            PredictionRecord {
                predicted: vec![],
                actual: vec![1],
            },
        ];
        (records, labels, samples)
    }

    #[test]
    fn test_trial_report_shows_none_for_empty_predictions() {
        let (records, labels, _) = fixture();
        let report = trial_report(&records, &[0, 1], &labels);
        assert!(report.contains("Actual"));
        assert!(report.contains("spam"));
        assert!(report.contains(NONE_LABEL));
    }

    #[test]
    fn test_error_report_lists_failures() {
        let (records, labels, samples) = fixture();
        let trial = score_trial(&records, &[0, 1], &samples, 2).unwrap();
        let report = error_report(&trial, &labels);
        assert!(report.contains("1 misclassified"));
        assert!(report.contains("second text"));
    }

    #[test]
    fn test_cumulative_report_contents() {
        let (records, labels, samples) = fixture();
        let trial = score_trial(&records, &[0, 1], &samples, 2).unwrap();
        let mut cumulative = crate::aggregate::cumulative(std::slice::from_ref(&trial)).unwrap();
        cumulative.expected_accuracy = Some(0.5);

        let report = cumulative_report(&cumulative, &labels);
        assert!(report.contains("RESULTS"));
        assert!(report.contains("max, mean, min accuracies = 0.500, 0.500, 0.500"));
        assert!(report.contains("expected labels = 0.500"));
        assert!(report.contains("Totals"));
    }

    #[test]
    fn test_outcome_serializes_round_trip() {
        let (records, _, samples) = fixture();
        let trial = score_trial(&records, &[0, 1], &samples, 2).unwrap();
        let outcome = ExperimentOutcome {
            protocol: Protocol::KFold(2),
            trials: vec![trial],
            cumulative: None,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&outcome).unwrap();
        let back: ExperimentOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back.protocol, Protocol::KFold(2));
        assert_eq!(back.trials.len(), 1);
        assert_eq!(back.trials[0].confusion, outcome.trials[0].confusion);
    }
}
