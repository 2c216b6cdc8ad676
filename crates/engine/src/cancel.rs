// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-cutting cancellation signaling: the Janitor and the external
//! cancel/delete operations both need to interrupt a running executor
//! without knowing which external process it currently has in flight.

use std::sync::Arc;

use ajob_core::job::{JobId, TerminalReason};
use dashmap::DashMap;
use tokio::sync::Notify;

/// One job's cancellation signal, plus the reason the canceller recorded so
/// the executor's terminal transition reports the right marker.
struct Signal {
    notify: Arc<Notify>,
    reason: parking_lot::Mutex<Option<TerminalReason>>,
}

/// Registry of in-flight jobs' cancellation signals. The executor registers
/// a job when it starts driving it and deregisters on exit; anything else
/// (the scheduler's `cancel`, the Janitor's timeout sweep) looks the job up
/// here and requests cancellation without needing a reference to the
/// executor task itself.
#[derive(Default)]
pub struct CancelRegistry {
    signals: DashMap<JobId, Arc<Signal>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_id: &JobId) -> Arc<Notify> {
        let signal = Arc::new(Signal {
            notify: Arc::new(Notify::new()),
            reason: parking_lot::Mutex::new(None),
        });
        let notify = signal.notify.clone();
        self.signals.insert(job_id.clone(), signal);
        notify
    }

    pub fn deregister(&self, job_id: &JobId) {
        self.signals.remove(job_id);
    }

    /// Requests cancellation with `reason`. A no-op if the job is not
    /// currently registered (e.g. it already finished) — callers that need
    /// idempotent cancel semantics check the job's terminal state first.
    pub fn request(&self, job_id: &JobId, reason: TerminalReason) {
        if let Some(signal) = self.signals.get(job_id) {
            *signal.reason.lock() = Some(reason);
            signal.notify.notify_one();
        }
    }

    /// The reason recorded by the most recent `request`, if any.
    pub fn taken_reason(&self, job_id: &JobId) -> Option<TerminalReason> {
        self.signals
            .get(job_id)
            .and_then(|s| *s.reason.lock())
    }

    pub fn is_registered(&self, job_id: &JobId) -> bool {
        self.signals.contains_key(job_id)
    }
}

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod tests;
