// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 textcat-eval contributors

//! Sample loading and label indexing for classifier evaluation
//!
//! Samples arrive as raw text with one or more gold label strings. A
//! [`LabelReference`] is built once per run from the distinct label strings
//! (first-seen order) and every downstream component works with integer
//! label indices into it.

use crate::error::{EvalError, Result};
use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Sentinel label string used when a model makes no prediction.
pub const NONE_LABEL: &str = "(none)";

/// A single evaluation sample: raw text, its whitespace tokens, and the
/// gold label indices assigned to it. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Original text content.
    pub text: String,
    /// Lowercased whitespace tokens of `text`.
    pub tokens: Vec<String>,
    /// Gold label indices into the run's [`LabelReference`].
    pub labels: Vec<usize>,
}

impl Sample {
    /// Build a sample from raw text and already-resolved label indices.
    pub fn new(text: impl Into<String>, labels: Vec<usize>) -> Self {
        let text = text.into();
        let tokens = tokenize(&text);
        Self {
            text,
            tokens,
            labels,
        }
    }
}

/// Minimal tokenization: lowercase, split on whitespace. Anything richer
/// (spell correction, stopword removal) belongs to an external
/// preprocessor.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// Canonical ordered list of distinct label strings for one run.
///
/// A label's position in this list is its integer index everywhere else.
/// The order is first-seen and fixed for the run's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelReference {
    labels: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl LabelReference {
    /// Build from label strings in first-seen order, skipping duplicates.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut reference = Self::default();
        for label in labels {
            reference.intern(label.as_ref());
        }
        reference
    }

    /// Return the index for `label`, inserting it if unseen.
    pub fn intern(&mut self, label: &str) -> usize {
        if let Some(&idx) = self.by_name.get(label) {
            return idx;
        }
        let idx = self.labels.len();
        self.labels.push(label.to_string());
        self.by_name.insert(label.to_string(), idx);
        idx
    }

    /// Index of a label string, if present.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.by_name.get(label).copied()
    }

    /// Label string at `idx`, or the `(none)` sentinel for out-of-range
    /// indices (used when mapping an absent prediction back to a string).
    pub fn name(&self, idx: usize) -> &str {
        self.labels.get(idx).map_or(NONE_LABEL, String::as_str)
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the reference is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All label strings in index order.
    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

/// Load samples from a CSV file.
///
/// Expected layout: a header row, then one row per sample with the text
/// in the first column and one gold label per remaining column. Empty
/// label cells are skipped; rows with no labels at all are dropped with
/// a warning.
pub fn load_csv(path: &Path) -> anyhow::Result<(Vec<Sample>, LabelReference)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open data file: {}", path.display()))?;

    let mut reference = LabelReference::default();
    let mut samples = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("failed to read row {} in {}", idx, path.display()))?;

        let text = record.get(0).unwrap_or("").to_string();
        let labels: Vec<usize> = record
            .iter()
            .skip(1)
            .filter(|cell| !cell.trim().is_empty())
            .map(|cell| reference.intern(cell.trim()))
            .collect();

        if labels.is_empty() {
            tracing::warn!("skipping row {} in {}: no labels", idx, path.display());
            continue;
        }

        samples.push(Sample::new(text, labels));
    }

    tracing::info!(
        "loaded {} samples with {} distinct labels from {}",
        samples.len(),
        reference.len(),
        path.display()
    );

    Ok((samples, reference))
}

/// Load an expected-label file: one row per sample position, expected
/// label string in the first column. Used for the optional
/// expected-label accuracy comparison.
pub fn load_expected_csv(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open expected-label file: {}", path.display()))?;

    let mut expected = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("failed to read row {} in {}", idx, path.display()))?;
        expected.push(record.get(0).unwrap_or("").trim().to_string());
    }

    Ok(expected)
}

/// Generate a synthetic multi-label dataset for tests and demos.
///
/// Each sample draws one to three topic labels and its text concatenates
/// phrases characteristic of those topics, so overlap-based classifiers
/// have real signal to learn. Deterministic for a fixed seed.
pub fn synthetic_dataset(size: usize, seed: u64) -> (Vec<Sample>, LabelReference) {
    let topics: [(&str, &[&str]); 4] = [
        (
            "billing",
            &["invoice was wrong", "charged twice this month", "refund still pending"],
        ),
        (
            "delivery",
            &["package arrived late", "courier missed the drop off", "tracking never updated"],
        ),
        (
            "quality",
            &["product broke after a week", "build feels cheap", "not as described"],
        ),
        (
            "support",
            &["agent was helpful", "waited hours on the line", "ticket closed without answer"],
        ),
    ];

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let reference = LabelReference::from_labels(topics.iter().map(|(name, _)| *name));

    let samples = (0..size)
        .map(|i| {
            let n_labels = rng.gen_range(1..=3.min(topics.len()));
            let mut label_indices: Vec<usize> = Vec::with_capacity(n_labels);
            while label_indices.len() < n_labels {
                let candidate = rng.gen_range(0..topics.len());
                if !label_indices.contains(&candidate) {
                    label_indices.push(candidate);
                }
            }

            let mut text = String::new();
            for &label in &label_indices {
                let phrases = topics[label].1;
                let phrase = phrases[rng.gen_range(0..phrases.len())];
                if !text.is_empty() {
                    text.push_str(" and ");
                }
                text.push_str(phrase);
            }
            text.push_str(&format!(" [case {i}]"));

            Sample::new(text, label_indices)
        })
        .collect();

    (samples, reference)
}

/// Count samples per label index across a slice of samples.
pub fn label_distribution(samples: &[Sample]) -> HashMap<usize, usize> {
    let mut dist = HashMap::new();
    for sample in samples {
        for &label in &sample.labels {
            *dist.entry(label).or_insert(0) += 1;
        }
    }
    dist
}

/// Validate that an expected-label sequence covers every sample position.
pub fn check_expected_len(expected: &[String], n_samples: usize) -> Result<()> {
    if expected.len() != n_samples {
        return Err(EvalError::invalid(format!(
            "expected-label sequence has {} entries for {} samples",
            expected.len(),
            n_samples
        )));
    }
    Ok(())
}
