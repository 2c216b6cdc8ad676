// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation errors raised while constructing core data-model values.
//!
//! These are reported synchronously to the caller and never cause a state
//! change, per the "Validation" error kind.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("repository name must not be empty")]
    EmptyRepositoryName,
    #[error("repository name {0:?} contains characters outside [A-Za-z0-9_-]")]
    IllegalRepositoryName(String),
    #[error("filename must not be empty")]
    EmptyFilename,
    #[error("filename {0:?} contains a path separator or '..'")]
    IllegalFilename(String),
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("prompt exceeds the configured maximum of {max} bytes")]
    PromptTooLong { max: usize },
}

/// Validates a staged-file name: non-empty, no path separators, no `..`
/// component. Used by the Workspace Manager before any filesystem write.
pub fn validate_filename(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }
    let illegal = name.contains('/') || name.contains('\\') || name == ".." || name == ".";
    if illegal {
        return Err(ValidationError::IllegalFilename(name.to_string()));
    }
    Ok(())
}

/// Validates a job prompt against a configured maximum length.
pub fn validate_prompt(prompt: &str, max_bytes: usize) -> Result<(), ValidationError> {
    if prompt.is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }
    if prompt.len() > max_bytes {
        return Err(ValidationError::PromptTooLong { max: max_bytes });
    }
    Ok(())
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
