// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registered repositories: the clone sources jobs are run against.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// Validated repository name: unique, case-sensitive, restricted to
/// `[A-Za-z0-9_-]`, non-empty. Unlike `JobId`/`Username`, this is not an
/// opaque generated ID — it is caller-supplied and used as an on-disk
/// directory name, so it is validated at construction rather than by the
/// `define_id!` macro.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::EmptyRepositoryName);
        }
        let valid = raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !valid {
            return Err(ValidationError::IllegalRepositoryName(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a registered repository's on-disk master clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneStatus {
    Cloning,
    Ready,
    Failed,
}

impl fmt::Display for CloneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloneStatus::Cloning => "cloning",
            CloneStatus::Ready => "ready",
            CloneStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// A named, on-disk working tree a job may clone from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredRepository {
    pub name: RepositoryName,
    pub path: PathBuf,
    pub upstream: Option<String>,
    pub status: CloneStatus,
    #[serde(with = "crate::time_fmt::serde_systemtime")]
    pub registered_at: SystemTime,
}

impl RegisteredRepository {
    pub fn new(
        name: RepositoryName,
        path: PathBuf,
        upstream: Option<String>,
        registered_at: SystemTime,
    ) -> Self {
        let status = if upstream.is_some() {
            CloneStatus::Cloning
        } else {
            CloneStatus::Ready
        };
        Self {
            name,
            path,
            upstream,
            status,
            registered_at,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == CloneStatus::Ready
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
