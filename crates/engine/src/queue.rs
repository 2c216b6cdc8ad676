// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The FIFO queue structure itself: guarded by its own lock, separate from
//! the Job Store (spec.md §5).

use std::collections::VecDeque;

use ajob_core::job::JobId;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// A pure FIFO of job-ids. `Scheduler` pairs this with a concurrency
/// semaphore to implement dispatch; this type only owns ordering.
#[derive(Default)]
pub struct Queue {
    entries: Mutex<VecDeque<JobId>>,
    notify: Notify,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the tail. Rejects a job already present (duplicate
    /// submission).
    pub fn submit(&self, job_id: JobId) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains(&job_id) {
            return false;
        }
        entries.push_back(job_id);
        drop(entries);
        self.notify.notify_one();
        true
    }

    /// Removes `job_id` if still queued. Returns whether it was present.
    pub fn cancel(&self, job_id: &JobId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|id| id != job_id);
        entries.len() != before
    }

    /// 1-based position, or `None` if not queued.
    pub fn position_of(&self, job_id: &JobId) -> Option<usize> {
        self.entries
            .lock()
            .iter()
            .position(|id| id == job_id)
            .map(|i| i + 1)
    }

    /// Blocks until a job is available, then pops and returns it.
    pub async fn take(&self) -> JobId {
        loop {
            if let Some(job_id) = self.entries.lock().pop_front() {
                return job_id;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
