// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Failures an [`crate::AcceleratorBackend`] surfaces while loading a model
/// or running a single inference. Every variant here is a documented entry
/// in §4.7's "engine transitions to FALLBACK mode" list — there is no
/// variant for "unknown failure" because an accelerator backend is
/// expected to classify its own failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AcceleratorError {
    #[error("no accelerator device present")]
    AcceleratorAbsent,

    #[error("model file not found: {0}")]
    ModelMissing(String),

    #[error("model input shape {got} does not match required feature length {expected}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("accelerator runtime error: {0}")]
    Runtime(String),
}
