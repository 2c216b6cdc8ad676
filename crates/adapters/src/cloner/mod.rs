// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Copy-on-write workspace cloning.

mod real;

pub use real::{RealCloneProbe, RealCowCloner};

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCloneProbe, FakeCowCloner};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from cloning a workspace out of a registered repository.
#[derive(Debug, Error)]
pub enum ClonerError {
    #[error("destination {0:?} already exists")]
    DestinationExists(std::path::PathBuf),
    #[error("source {0:?} does not exist")]
    SourceMissing(std::path::PathBuf),
    #[error("clone failed: {0}")]
    Failed(String),
}

/// Which filesystem primitive a clone used, reported for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneMethod {
    Reflink,
    SubvolumeSnapshot,
    Hardlink,
    FullCopy,
}

impl std::fmt::Display for CloneMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CloneMethod::Reflink => "reflink",
            CloneMethod::SubvolumeSnapshot => "subvolume-snapshot",
            CloneMethod::Hardlink => "hardlink",
            CloneMethod::FullCopy => "full-copy",
        };
        write!(f, "{}", s)
    }
}

/// Probes a destination filesystem once (at daemon startup) and reports the
/// best clone strategy it supports, in the preference order
/// reflink > subvolume snapshot > hardlink > full copy.
pub trait CloneProbe: Send + Sync + 'static {
    fn probe(&self, root: &Path) -> CloneMethod;
}

/// Produces an isolated, independently-writable workspace from a registered
/// repository's on-disk master clone.
///
/// Precondition: `dest_dir` does not exist; its parent exists and is
/// writable. Postcondition on success: `dest_dir` contains a byte-identical,
/// independent copy of `source_dir`. Implementations never follow symlinks
/// that point outside `source_dir`.
#[async_trait]
pub trait CowCloner: Clone + Send + Sync + 'static {
    async fn clone_tree(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
    ) -> Result<CloneMethod, ClonerError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
