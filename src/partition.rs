// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 textcat-eval contributors

//! K-fold partitioning of sample indices
//!
//! Splits an index sequence into k disjoint evaluation folds with
//! complementary training folds. The eval sets of the k folds partition
//! the full index set exactly: pairwise disjoint, nothing omitted.

use crate::error::{EvalError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// One cross-validation fold: disjoint train and eval index sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    /// Indices the model trains on.
    pub train: Vec<usize>,
    /// Indices the model is evaluated on.
    pub eval: Vec<usize>,
}

/// Splits an index range into k folds.
///
/// With `randomize` and no seed, indices are shuffled from entropy; that
/// run is not reproducible, which is documented behavior. Fix a seed to
/// make the permutation repeatable.
#[derive(Debug, Clone)]
pub struct FoldPartitioner {
    k: usize,
    randomize: bool,
    seed: Option<u64>,
}

impl FoldPartitioner {
    /// Create a partitioner for `k` folds, no shuffling.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            randomize: false,
            seed: None,
        }
    }

    /// Shuffle indices before partitioning.
    pub fn randomized(mut self) -> Self {
        self.randomize = true;
        self
    }

    /// Fix the shuffle seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Split `indices` into k folds.
    ///
    /// The indices are divided into k contiguous blocks of size ⌊N/k⌋,
    /// with one extra index going to each of the first N mod k blocks.
    /// Fold i evaluates block i and trains on the remaining blocks
    /// concatenated in block order.
    pub fn split(&self, indices: &[usize]) -> Result<Vec<Fold>> {
        let n = indices.len();
        if self.k < 1 {
            return Err(EvalError::invalid("fold count k must be at least 1"));
        }
        if self.k > n {
            return Err(EvalError::invalid(format!(
                "fold count k={} exceeds sample count {}",
                self.k, n
            )));
        }

        let mut indices = indices.to_vec();
        if self.randomize {
            let mut rng = match self.seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let fold_size = n / self.k;
        let remainder = n % self.k;

        let mut folds = Vec::with_capacity(self.k);
        let mut start = 0;
        for i in 0..self.k {
            let extra = usize::from(i < remainder);
            let end = start + fold_size + extra;

            let eval = indices[start..end].to_vec();
            let train = indices[..start]
                .iter()
                .chain(indices[end..].iter())
                .copied()
                .collect();

            folds.push(Fold { train, eval });
            start = end;
        }

        Ok(folds)
    }
}
