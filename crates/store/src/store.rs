// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-memory authoritative map of jobs: the single source of truth for
//! job state, queue position, captured output, exit code, and timestamps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ajob_core::job::{Job, JobId, JobState};
use ajob_core::owner::Username;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::StoreError;

const DEFAULT_OUTPUT_BUFFER_MAX_BYTES: usize = 1024 * 1024;

/// A concurrent mapping keyed by job-id. Every job's mutable fields sit
/// behind their own lock, so two jobs never contend with each other; readers
/// of a single job always see one of its past or present states in full,
/// never a half-applied patch.
pub struct JobStore {
    jobs: DashMap<JobId, Arc<Mutex<Job>>>,
    queue_seq: DashMap<JobId, u64>,
    next_seq: AtomicU64,
    output_buffer_max_bytes: usize,
}

impl JobStore {
    pub fn new(output_buffer_max_bytes: usize) -> Self {
        Self {
            jobs: DashMap::new(),
            queue_seq: DashMap::new(),
            next_seq: AtomicU64::new(0),
            output_buffer_max_bytes,
        }
    }

    /// Inserts a new job, or overwrites an existing one wholesale (used only
    /// by `put` at creation time; every other mutation goes through `patch`).
    pub fn put(&self, job: Job) {
        let id = job.id.clone();
        if job.state == JobState::Queued {
            self.stamp_queued(&id);
        }
        self.jobs.insert(id, Arc::new(Mutex::new(job)));
    }

    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.get(id).map(|entry| entry.lock().clone())
    }

    pub fn list_by_owner(&self, owner: &Username) -> Vec<Job> {
        self.jobs
            .iter()
            .filter_map(|entry| {
                let job = entry.value().lock();
                (job.owner == *owner).then(|| job.clone())
            })
            .collect()
    }

    /// Queued jobs ordered by submit order: position 0 is next to dispatch.
    pub fn list_queued_ordered(&self) -> Vec<Job> {
        let mut ordered: Vec<(u64, Job)> = self
            .jobs
            .iter()
            .filter_map(|entry| {
                let job = entry.value().lock();
                if job.state != JobState::Queued {
                    return None;
                }
                let seq = self
                    .queue_seq
                    .get(entry.key())
                    .map(|s| *s)
                    .unwrap_or(u64::MAX);
                Some((seq, job.clone()))
            })
            .collect();
        ordered.sort_by_key(|(seq, _)| *seq);
        ordered.into_iter().map(|(_, job)| job).collect()
    }

    /// Applies `updates` to the job under its exclusive lock and returns the
    /// resulting snapshot. Detects transitions into and out of `queued` to
    /// keep the FIFO ordering bookkeeping current.
    pub fn patch(
        &self,
        id: &JobId,
        updates: impl FnOnce(&mut Job),
    ) -> Result<Job, StoreError> {
        let entry = self
            .jobs
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let mut job = entry.value().lock();
        let was_queued = job.state == JobState::Queued;
        updates(&mut job);
        let is_queued = job.state == JobState::Queued;
        if is_queued && !was_queued {
            self.stamp_queued(id);
        } else if !is_queued && was_queued {
            self.queue_seq.remove(id);
        }
        Ok(job.clone())
    }

    /// Appends a chunk of captured output, enforcing `output_buffer_max_bytes`
    /// by dropping the oldest content and recording a single truncation
    /// marker (rather than one marker per overflowing append).
    pub fn append_output(&self, id: &JobId, chunk: &[u8]) -> Result<(), StoreError> {
        let entry = self
            .jobs
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let mut job = entry.value().lock();
        job.captured_output
            .push_str(&String::from_utf8_lossy(chunk));

        if job.captured_output.len() > self.output_buffer_max_bytes {
            let excess = job.captured_output.len() - self.output_buffer_max_bytes;
            let cut_at = (excess..job.captured_output.len())
                .find(|&i| job.captured_output.is_char_boundary(i))
                .unwrap_or(job.captured_output.len());
            job.captured_output.drain(..cut_at);
            job.output_truncated = true;
        }
        Ok(())
    }

    /// Removes a job entirely (terminal-retention reap, or explicit delete).
    pub fn remove(&self, id: &JobId) -> Option<Job> {
        self.queue_seq.remove(id);
        self.jobs.remove(id).map(|(_, job)| job.lock().clone())
    }

    /// All jobs currently held, for the Janitor's timeout/retention sweeps.
    pub fn all(&self) -> Vec<Job> {
        self.jobs.iter().map(|entry| entry.value().lock().clone()).collect()
    }

    fn stamp_queued(&self, id: &JobId) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.queue_seq.insert(id.clone(), seq);
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_BUFFER_MAX_BYTES)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
