// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake impersonator and user lookup for testing the executor without
//! spawning real processes or touching `/etc/passwd`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use super::host_user::{HostUser, HostUserLookup};
use super::{Impersonator, ImpersonatorError, ProcessHandle, RunOutcome, RunRequest};

/// A fake [`HostUserLookup`] seeded with known users; anything else is
/// reported as unknown, the same as a real `getpwnam` miss.
#[derive(Clone, Default)]
pub struct FakeHostUserLookup {
    users: Arc<Mutex<HashMap<String, HostUser>>>,
}

impl FakeHostUserLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: impl Into<String>, user: HostUser) {
        self.users.lock().insert(username.into(), user);
    }
}

impl HostUserLookup for FakeHostUserLookup {
    fn lookup(&self, username: &str) -> Result<HostUser, ImpersonatorError> {
        self.users
            .lock()
            .get(username)
            .cloned()
            .ok_or_else(|| ImpersonatorError::UnknownUser(username.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct ImpersonatorCall {
    pub target_user: String,
    pub program: String,
    pub args: Vec<String>,
}

struct FakeImpersonatorState {
    calls: Vec<ImpersonatorCall>,
    scripted_outcome: RunOutcome,
    scripted_output: Vec<Vec<u8>>,
    fail_next: Option<ImpersonatorError>,
    /// Per-call overrides, keyed by `program` and `args` joined with a
    /// space (see `call_key`), for tests that drive several distinct
    /// commands (git remote, git pull, the indexer, the agent) through one
    /// impersonator and need each to behave differently. Falls back to the
    /// global `scripted_outcome`/`scripted_output` when a call has no
    /// override registered.
    keyed_outcomes: HashMap<String, RunOutcome>,
    keyed_outputs: HashMap<String, Vec<Vec<u8>>>,
}

fn call_key(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}

/// Records every [`RunRequest`] and replays a scripted outcome and output
/// instead of spawning a process. The executor's retry/termination logic is
/// tested against this rather than a real shell-out.
#[derive(Clone)]
pub struct FakeImpersonator {
    inner: Arc<Mutex<FakeImpersonatorState>>,
}

impl Default for FakeImpersonator {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeImpersonatorState {
                calls: Vec::new(),
                scripted_outcome: RunOutcome::Exited(0),
                scripted_output: Vec::new(),
                fail_next: None,
                keyed_outcomes: HashMap::new(),
                keyed_outputs: HashMap::new(),
            })),
        }
    }
}

impl FakeImpersonator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ImpersonatorCall> {
        self.inner.lock().calls.clone()
    }

    pub fn set_outcome(&self, outcome: RunOutcome) {
        self.inner.lock().scripted_outcome = outcome;
    }

    pub fn set_output(&self, chunks: Vec<Vec<u8>>) {
        self.inner.lock().scripted_output = chunks;
    }

    pub fn fail_next_with(&self, err: ImpersonatorError) {
        self.inner.lock().fail_next = Some(err);
    }

    /// Scripts the outcome for future calls matching `program` and `args`
    /// exactly (e.g. `"git", &["pull"]`), overriding the global
    /// `set_outcome` for that call only.
    pub fn set_outcome_for(&self, program: &str, args: &[&str], outcome: RunOutcome) {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.inner.lock().keyed_outcomes.insert(call_key(program, &args), outcome);
    }

    /// Scripts the replayed output for future calls matching `program` and
    /// `args` exactly, overriding the global `set_output` for that call
    /// only.
    pub fn set_output_for(&self, program: &str, args: &[&str], chunks: Vec<Vec<u8>>) {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.inner.lock().keyed_outputs.insert(call_key(program, &args), chunks);
    }
}

#[async_trait]
impl Impersonator for FakeImpersonator {
    async fn run(&self, request: RunRequest) -> Result<ProcessHandle, ImpersonatorError> {
        let (outcome, output, failure) = {
            let mut inner = self.inner.lock();
            inner.calls.push(ImpersonatorCall {
                target_user: request.target_user.clone(),
                program: request.program.clone(),
                args: request.args.clone(),
            });
            let failure = inner.fail_next.take();
            let key = call_key(&request.program, &request.args);
            let outcome = inner
                .keyed_outcomes
                .get(&key)
                .copied()
                .unwrap_or(inner.scripted_outcome);
            let output = inner
                .keyed_outputs
                .get(&key)
                .cloned()
                .unwrap_or_else(|| inner.scripted_output.clone());
            (outcome, output, failure)
        };

        if let Some(err) = failure {
            return Err(err);
        }

        let (tx, rx) = mpsc::channel(output.len().max(1));
        for chunk in output {
            let _ = tx.send(chunk).await;
        }
        drop(tx);

        let cancel = Arc::new(Notify::new());
        let wait_task = tokio::spawn(async move { outcome });

        Ok(ProcessHandle::new(rx, cancel, wait_task))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
