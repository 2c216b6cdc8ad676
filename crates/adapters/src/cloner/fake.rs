// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake cloner and probe for testing the engine without touching a real
//! filesystem's CoW capabilities.

use super::{CloneMethod, CloneProbe, ClonerError, CowCloner};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A probe that always reports a configured method, so tests can exercise
/// each tier without depending on the host filesystem's actual capabilities.
#[derive(Clone)]
pub struct FakeCloneProbe {
    pub method: CloneMethod,
}

impl FakeCloneProbe {
    pub fn new(method: CloneMethod) -> Self {
        Self { method }
    }
}

impl CloneProbe for FakeCloneProbe {
    fn probe(&self, _root: &Path) -> CloneMethod {
        self.method
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneCall {
    pub source: PathBuf,
    pub dest: PathBuf,
}

struct FakeCowClonerState {
    calls: Vec<CloneCall>,
    existing: HashSet<PathBuf>,
    fail_next: Option<String>,
}

/// In-memory `CowCloner`: tracks which directories "exist" and records
/// calls, without touching the real filesystem. Workspace isolation tests
/// use this to assert the executor asks for exactly one clone per job and
/// never reuses a destination.
#[derive(Clone)]
pub struct FakeCowCloner {
    inner: Arc<Mutex<FakeCowClonerState>>,
    reported_method: CloneMethod,
}

impl FakeCowCloner {
    pub fn new(reported_method: CloneMethod) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeCowClonerState {
                calls: Vec::new(),
                existing: HashSet::new(),
                fail_next: None,
            })),
            reported_method,
        }
    }

    pub fn calls(&self) -> Vec<CloneCall> {
        self.inner.lock().calls.clone()
    }

    pub fn mark_existing(&self, path: &Path) {
        self.inner.lock().existing.insert(path.to_path_buf());
    }

    pub fn fail_next_with(&self, message: impl Into<String>) {
        self.inner.lock().fail_next = Some(message.into());
    }
}

impl Default for FakeCowCloner {
    fn default() -> Self {
        Self::new(CloneMethod::Reflink)
    }
}

#[async_trait]
impl CowCloner for FakeCowCloner {
    async fn clone_tree(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
    ) -> Result<CloneMethod, ClonerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(CloneCall {
            source: source_dir.to_path_buf(),
            dest: dest_dir.to_path_buf(),
        });

        if let Some(message) = inner.fail_next.take() {
            return Err(ClonerError::Failed(message));
        }
        if inner.existing.contains(dest_dir) {
            return Err(ClonerError::DestinationExists(dest_dir.to_path_buf()));
        }
        inner.existing.insert(dest_dir.to_path_buf());
        Ok(self.reported_method)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
