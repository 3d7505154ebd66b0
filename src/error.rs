// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 textcat-eval contributors

//! Error types for the evaluation core
//!
//! Every error here is a caller contract violation: malformed partition
//! requests, mismatched sequence lengths, empty aggregation inputs, or an
//! empty actual-label set. None of them are retried or silently defaulted.
//! Failures inside an external model collaborator are surfaced separately
//! as `anyhow` errors at the orchestration layer.

use thiserror::Error;

/// Errors raised by the evaluation core.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A caller violated an API contract (bad fold count, length
    /// mismatch, empty input where one is required).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl EvalError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EvalError::InvalidArgument(msg.into())
    }
}

/// Result type for evaluation-core operations.
pub type Result<T> = std::result::Result<T, EvalError>;
