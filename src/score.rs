// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 textcat-eval contributors

//! Scoring of multi-label predictions against gold labels
//!
//! Implements set-overlap accuracy (fraction of a sample's gold labels
//! present among its predictions), winning-label selection with an
//! explicit tie-break, and a confusion matrix with a "(none)" bucket and
//! totals margins.

use crate::dataset::{LabelReference, Sample, NONE_LABEL};
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The predicted and actual label indices for one evaluated sample.
/// Predictions are ordered most confident first; an empty prediction
/// list means the model declined to predict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub predicted: Vec<usize>,
    pub actual: Vec<usize>,
}

/// Select up to `limit` winning labels from a frequency array, ordered
/// by descending frequency. Labels with frequency ≤ 0 are excluded.
///
/// Tie-break: among equal frequencies the higher label index wins. The
/// system this replaces inherited that ordering from its sort routine's
/// stability; here it is a deliberate, tested policy so equally-frequent
/// candidates resolve the same way on every platform.
pub fn winning_labels(frequencies: &[f64], limit: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..frequencies.len()).collect();
    order.sort_by(|&a, &b| {
        frequencies[b]
            .partial_cmp(&frequencies[a])
            .unwrap_or(Ordering::Equal)
            .then(b.cmp(&a))
    });
    order
        .into_iter()
        .filter(|&i| frequencies[i] > 0.0)
        .take(limit)
        .collect()
}

/// Per-sample multi-label accuracy: |actual ∩ predicted| / |actual|.
///
/// An empty prediction scores 0.0. An empty actual set is a caller bug
/// (division by zero is not a valid accuracy).
pub fn sample_accuracy(actual: &[usize], predicted: &[usize]) -> Result<f64> {
    if actual.is_empty() {
        return Err(EvalError::invalid(
            "actual label set is empty; accuracy is undefined",
        ));
    }
    let common = actual.iter().filter(|l| predicted.contains(l)).count();
    Ok(common as f64 / actual.len() as f64)
}

/// Mean per-sample accuracy over parallel predicted/actual sequences.
pub fn trial_accuracy(predicted: &[Vec<usize>], actual: &[Vec<usize>]) -> Result<f64> {
    if predicted.len() != actual.len() {
        return Err(EvalError::invalid(format!(
            "predicted and actual sequences differ in length: {} vs {}",
            predicted.len(),
            actual.len()
        )));
    }
    if actual.is_empty() {
        return Err(EvalError::invalid("no samples to score"));
    }
    let mut total = 0.0;
    for (p, a) in predicted.iter().zip(actual.iter()) {
        total += sample_accuracy(a, p)?;
    }
    Ok(total / actual.len() as f64)
}

/// Actual-vs-predicted counts with a "(none)" bucket.
///
/// The matrix is square, (L+1) × (L+1) for L labels; the extra index
/// records "no prediction made". Multi-label outputs are reduced to the
/// first predicted and first actual label for display, a documented
/// simplification carried over from the system this replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<u64>>,
    n_labels: usize,
}

impl ConfusionMatrix {
    /// Create an empty matrix for `n_labels` labels.
    pub fn new(n_labels: usize) -> Self {
        Self {
            counts: vec![vec![0; n_labels + 1]; n_labels + 1],
            n_labels,
        }
    }

    /// Number of real labels (excluding the "(none)" bucket).
    pub fn n_labels(&self) -> usize {
        self.n_labels
    }

    /// Count at [actual][predicted]; index `n_labels` is the "(none)"
    /// bucket.
    pub fn get(&self, actual: usize, predicted: usize) -> u64 {
        self.counts[actual][predicted]
    }

    /// Record one sample: first actual label against first predicted
    /// label, or against "(none)" when the prediction is empty.
    pub fn record(&mut self, actual_first: usize, predicted_first: Option<usize>) {
        let col = predicted_first.unwrap_or(self.n_labels);
        self.counts[actual_first][col] += 1;
    }

    /// Total number of recorded samples.
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Populate from prediction records. Only the first predicted label
    /// of each record is counted.
    pub fn from_records(records: &[PredictionRecord], n_labels: usize) -> Result<Self> {
        let mut cm = Self::new(n_labels);
        for record in records {
            let &actual_first = record.actual.first().ok_or_else(|| {
                EvalError::invalid("actual label set is empty; cannot build confusion matrix")
            })?;
            cm.record(actual_first, record.predicted.first().copied());
        }
        Ok(cm)
    }

    /// Element-wise add another matrix into this one. Shape mismatch
    /// indicates a label-reference inconsistency across folds and is
    /// never coerced.
    pub fn merge(&mut self, other: &ConfusionMatrix) -> Result<()> {
        if self.n_labels != other.n_labels {
            return Err(EvalError::invalid(format!(
                "confusion matrix shapes differ: {} vs {} labels",
                self.n_labels, other.n_labels
            )));
        }
        for (row, other_row) in self.counts.iter_mut().zip(other.counts.iter()) {
            for (cell, &other_cell) in row.iter_mut().zip(other_row.iter()) {
                *cell += other_cell;
            }
        }
        Ok(())
    }

    /// The full (L+2) × (L+2) display table: counts plus a totals row
    /// (column sums) and totals column (row sums). The bottom-right
    /// cell is the grand total of recorded samples.
    pub fn table(&self) -> Vec<Vec<u64>> {
        let dim = self.n_labels + 1;
        let mut table = Vec::with_capacity(dim + 1);
        for row in &self.counts {
            let mut out: Vec<u64> = row.clone();
            out.push(row.iter().sum());
            table.push(out);
        }
        let mut totals: Vec<u64> = (0..=dim)
            .map(|col| table.iter().map(|row| row[col]).sum())
            .collect();
        // Bottom-right must be the grand total, not a double count.
        totals[dim] = self.total();
        table.push(totals);
        table
    }

    /// Render the totals table with human-readable row/column labels.
    pub fn render(&self, labels: &LabelReference) -> String {
        let mut names: Vec<&str> = labels.as_slice().iter().map(String::as_str).collect();
        names.push(NONE_LABEL);
        names.push("Totals");

        let width = names.iter().map(|n| n.len()).max().unwrap_or(6).max(6) + 2;
        let table = self.table();

        let mut out = String::new();
        out.push_str(&format!("{:width$}", ""));
        for name in &names {
            out.push_str(&format!("{name:>width$}"));
        }
        out.push('\n');

        for (row, name) in table.iter().zip(names.iter()) {
            out.push_str(&format!("{name:<width$}"));
            for cell in row {
                out.push_str(&format!("{cell:>width$}"));
            }
            out.push('\n');
        }
        out
    }
}

/// One imperfectly-scored sample, kept for diagnostic reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Misclassification {
    /// Original index of the sample within the run.
    pub sample_index: usize,
    /// Raw sample text.
    pub text: String,
    pub actual: Vec<usize>,
    pub predicted: Vec<usize>,
    /// The per-sample accuracy achieved (< 1.0).
    pub accuracy: f64,
}

/// Accumulated statistics for one evaluated fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Mean per-sample accuracy over the fold.
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    /// Samples that scored below 1.0, for diagnostic display.
    pub errors: Vec<Misclassification>,
}

/// Score one fold's prediction records.
///
/// `eval_indices` carries the original position of each record's sample
/// so misclassifications can be tied back to the run's sample list.
pub fn score_trial(
    records: &[PredictionRecord],
    eval_indices: &[usize],
    samples: &[Sample],
    n_labels: usize,
) -> Result<TrialResult> {
    if records.len() != eval_indices.len() {
        return Err(EvalError::invalid(format!(
            "prediction records and eval indices differ in length: {} vs {}",
            records.len(),
            eval_indices.len()
        )));
    }
    if records.is_empty() {
        return Err(EvalError::invalid("no samples to score"));
    }

    let mut total = 0.0;
    let mut errors = Vec::new();
    for (record, &idx) in records.iter().zip(eval_indices.iter()) {
        let accuracy = sample_accuracy(&record.actual, &record.predicted)?;
        total += accuracy;
        if accuracy < 1.0 {
            errors.push(Misclassification {
                sample_index: idx,
                text: samples.get(idx).map(|s| s.text.clone()).unwrap_or_default(),
                actual: record.actual.clone(),
                predicted: record.predicted.clone(),
                accuracy,
            });
        }
    }

    Ok(TrialResult {
        accuracy: total / records.len() as f64,
        confusion: ConfusionMatrix::from_records(records, n_labels)?,
        errors,
    })
}
