// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 textcat-eval contributors

//! The abstract classifier capability the evaluation core drives
//!
//! The core never looks inside a model: it encodes samples through it,
//! streams training samples into it one at a time, and asks it for a
//! fixed number of predicted labels per test sample. Model failures are
//! external-collaborator failures and surface as `anyhow` errors.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// An encoded sample pattern. The bitmap is a sorted list of active bit
/// positions in an n-dimensional sparse representation; how it was
/// produced (remote API, local projection) is the encoder's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Joined text the pattern was encoded from.
    pub text: String,
    /// Sorted active bit positions.
    pub bitmap: Vec<u32>,
    /// Fraction of bits active.
    pub sparsity: f64,
}

/// An encoded sample paired with its gold label indices, ready for
/// streaming train/test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedSample {
    pub pattern: Pattern,
    pub labels: Vec<usize>,
}

/// Classifier capability: reset, encode, train, test.
///
/// Implementations are expected to be streaming: `train` and `test` are
/// called once per sample, in input order, and may update internal state
/// incrementally.
pub trait Model {
    /// Short model name for logs and reports.
    fn name(&self) -> &str;

    /// Fully clear learned state. After a reset, predictions must be
    /// independent of anything trained before it.
    fn reset(&mut self);

    /// Encode a tokenized sample into a pattern.
    fn encode(&mut self, tokens: &[String]) -> Result<Pattern>;

    /// Train on one sample with its full gold label set.
    fn train(&mut self, pattern: &Pattern, labels: &[usize]) -> Result<()>;

    /// Predict up to `num_labels` label indices for one sample, most
    /// confident first. An empty result means no prediction.
    fn test(&self, pattern: &Pattern, num_labels: usize) -> Result<Vec<usize>>;
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn encode(&mut self, tokens: &[String]) -> Result<Pattern> {
        (**self).encode(tokens)
    }

    fn train(&mut self, pattern: &Pattern, labels: &[usize]) -> Result<()> {
        (**self).train(pattern, labels)
    }

    fn test(&self, pattern: &Pattern, num_labels: usize) -> Result<Vec<usize>> {
        (**self).test(pattern, num_labels)
    }
}
