// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 textcat-eval contributors

//! Reference implementations of the [`Model`] capability
//!
//! These exist so the evaluation core can be exercised end to end without
//! a remote encoder or a real learning system:
//! - [`RandomModel`]: seeded uniform guesses, the floor any classifier
//!   must beat.
//! - [`MajorityModel`]: predicts the most frequent training labels,
//!   ignoring the pattern.
//! - [`BitmapOverlapModel`]: deterministic random-projection bitmaps per
//!   sample, an accumulated bitmap per category, overlap-count inference.

use crate::model::{Model, Pattern};
use crate::score::winning_labels;
use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// Configuration for sparse bitmap encodings. The defaults match the
/// dimensions of standard text-fingerprint encoders.
#[derive(Debug, Clone, Copy)]
pub struct BitmapConfig {
    /// Total bit positions.
    pub n: usize,
    /// Active bit positions per pattern.
    pub w: usize,
}

impl Default for BitmapConfig {
    fn default() -> Self {
        Self { n: 16_384, w: 328 }
    }
}

/// Deterministic pseudo-random bitmap for a text: the text itself seeds
/// the generator, so equal texts always encode identically.
fn encode_randomly(text: &str, config: BitmapConfig) -> Pattern {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let mut rng = ChaCha8Rng::seed_from_u64(hasher.finish());

    let mut positions: HashSet<u32> = HashSet::with_capacity(config.w);
    while positions.len() < config.w.min(config.n) {
        positions.insert(rng.gen_range(0..config.n as u32));
    }
    let mut bitmap: Vec<u32> = positions.into_iter().collect();
    bitmap.sort_unstable();

    Pattern {
        text: text.to_string(),
        bitmap,
        sparsity: config.w as f64 / config.n as f64,
    }
}

/// Uniform random predictions over the label universe.
#[derive(Debug, Clone)]
pub struct RandomModel {
    n_labels: usize,
    seed: u64,
    config: BitmapConfig,
}

impl RandomModel {
    pub fn new(n_labels: usize, seed: u64) -> Self {
        Self {
            n_labels,
            seed,
            config: BitmapConfig::default(),
        }
    }
}

impl Model for RandomModel {
    fn name(&self) -> &str {
        "random"
    }

    fn reset(&mut self) {
        // Nothing learned, nothing to clear.
    }

    fn encode(&mut self, tokens: &[String]) -> Result<Pattern> {
        Ok(encode_randomly(&tokens.join(" "), self.config))
    }

    fn train(&mut self, _pattern: &Pattern, _labels: &[usize]) -> Result<()> {
        Ok(())
    }

    fn test(&self, pattern: &Pattern, num_labels: usize) -> Result<Vec<usize>> {
        if self.n_labels == 0 {
            return Ok(Vec::new());
        }
        // Seed per pattern so a given sample always gets the same guess.
        let mut hasher = DefaultHasher::new();
        pattern.text.hash(&mut hasher);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ hasher.finish());

        let take = num_labels.min(self.n_labels);
        let mut picked: Vec<usize> = Vec::with_capacity(take);
        while picked.len() < take {
            let candidate = rng.gen_range(0..self.n_labels);
            if !picked.contains(&candidate) {
                picked.push(candidate);
            }
        }
        Ok(picked)
    }
}

/// Predicts the most frequent labels seen during training, regardless of
/// the input pattern. Untrained, it predicts nothing.
#[derive(Debug, Clone)]
pub struct MajorityModel {
    counts: Vec<f64>,
    config: BitmapConfig,
}

impl MajorityModel {
    pub fn new(n_labels: usize) -> Self {
        Self {
            counts: vec![0.0; n_labels],
            config: BitmapConfig::default(),
        }
    }
}

impl Model for MajorityModel {
    fn name(&self) -> &str {
        "majority"
    }

    fn reset(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0.0);
    }

    fn encode(&mut self, tokens: &[String]) -> Result<Pattern> {
        Ok(encode_randomly(&tokens.join(" "), self.config))
    }

    fn train(&mut self, _pattern: &Pattern, labels: &[usize]) -> Result<()> {
        for &label in labels {
            if label < self.counts.len() {
                self.counts[label] += 1.0;
            }
        }
        Ok(())
    }

    fn test(&self, _pattern: &Pattern, num_labels: usize) -> Result<Vec<usize>> {
        Ok(winning_labels(&self.counts, num_labels))
    }
}

/// Streaming overlap classifier over sparse bitmaps.
///
/// Training accumulates each sample's bitmap into a per-category bitmap,
/// one sample at a time. Inference scores every category by how many of
/// the sample's active bits its accumulated bitmap contains, then picks
/// winners by descending overlap.
#[derive(Debug, Clone)]
pub struct BitmapOverlapModel {
    n_labels: usize,
    config: BitmapConfig,
    category_bitmaps: HashMap<usize, HashSet<u32>>,
}

impl BitmapOverlapModel {
    pub fn new(n_labels: usize) -> Self {
        Self::with_config(n_labels, BitmapConfig::default())
    }

    pub fn with_config(n_labels: usize, config: BitmapConfig) -> Self {
        Self {
            n_labels,
            config,
            category_bitmaps: HashMap::new(),
        }
    }
}

impl Model for BitmapOverlapModel {
    fn name(&self) -> &str {
        "bitmap-overlap"
    }

    fn reset(&mut self) {
        self.category_bitmaps.clear();
    }

    fn encode(&mut self, tokens: &[String]) -> Result<Pattern> {
        Ok(encode_randomly(&tokens.join(" "), self.config))
    }

    fn train(&mut self, pattern: &Pattern, labels: &[usize]) -> Result<()> {
        for &label in labels {
            let bits = self.category_bitmaps.entry(label).or_default();
            bits.extend(pattern.bitmap.iter().copied());
        }
        Ok(())
    }

    fn test(&self, pattern: &Pattern, num_labels: usize) -> Result<Vec<usize>> {
        let mut overlaps = vec![0.0; self.n_labels];
        for (&label, bits) in &self.category_bitmaps {
            if label < self.n_labels {
                overlaps[label] = pattern
                    .bitmap
                    .iter()
                    .filter(|pos| bits.contains(pos))
                    .count() as f64;
            }
        }
        Ok(winning_labels(&overlaps, num_labels))
    }
}
