// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running a child process under a different OS identity than the daemon.

mod host_user;
mod real;

pub use host_user::{HostUser, HostUserLookup, RealHostUserLookup};
pub use real::{ImpersonationMode, RealImpersonator};

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeHostUserLookup, FakeImpersonator, ImpersonatorCall};

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use std::sync::Arc;

#[derive(Debug, Error)]
pub enum ImpersonatorError {
    #[error("unknown target user: {0}")]
    UnknownUser(String),
    #[error("insufficient privilege to switch to user {0}")]
    PermissionDenied(String),
    #[error("executable not found: {0}")]
    ExecutableNotFound(String),
    #[error("failed to launch process: {0}")]
    SpawnFailed(String),
}

/// A single request to run `program` under `target_user`'s identity.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub target_user: String,
    pub working_dir: PathBuf,
    pub program: String,
    pub args: Vec<String>,
    pub stdin_bytes: Vec<u8>,
    pub env_overrides: Vec<(String, String)>,
    pub timeout: Duration,
}

/// How a run concluded. `wait()` on the returned [`ProcessHandle`] resolves
/// to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Exited(i32),
    /// The distinguished "cancelled" exit recorded when a cancellation
    /// token fired before the process exited on its own.
    Cancelled,
    /// The per-process timeout elapsed before the process exited or was
    /// cancelled.
    TimedOut,
}

/// A running (or just-finished) impersonated process: a merged
/// stdout+stderr stream the caller reads concurrently with the process,
/// plus a `wait()` that resolves once the process has truly exited.
#[derive(Debug)]
pub struct ProcessHandle {
    pub output: mpsc::Receiver<Vec<u8>>,
    cancel: Arc<Notify>,
    wait_task: tokio::task::JoinHandle<RunOutcome>,
}

impl ProcessHandle {
    pub(crate) fn new(
        output: mpsc::Receiver<Vec<u8>>,
        cancel: Arc<Notify>,
        wait_task: tokio::task::JoinHandle<RunOutcome>,
    ) -> Self {
        Self {
            output,
            cancel,
            wait_task,
        }
    }

    /// Signals cancellation. The impersonator sends a termination signal,
    /// waits up to the cancellation grace period, then force-kills.
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    /// A cloneable handle that can call `cancel()` independently of `self`,
    /// for callers that need to retain the ability to cancel after handing
    /// `self` to `wait()`.
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken(self.cancel.clone())
    }

    /// Waits for the process to reach a final [`RunOutcome`]. Output already
    /// read from `output` before this resolves is retained by the caller.
    pub async fn wait(self) -> RunOutcome {
        self.wait_task.await.unwrap_or(RunOutcome::Exited(-1))
    }
}

/// A cloneable, detached handle to a [`ProcessHandle`]'s cancellation
/// signal, usable after the handle itself has been consumed by `wait()`.
#[derive(Clone)]
pub struct CancelToken(Arc<Notify>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.notify_one();
    }
}

/// Launches a child process under a target OS identity, capturing merged
/// stdout/stderr, enforcing a timeout, and supporting cooperative
/// cancellation.
#[async_trait]
pub trait Impersonator: Clone + Send + Sync + 'static {
    async fn run(&self, request: RunRequest) -> Result<ProcessHandle, ImpersonatorError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
