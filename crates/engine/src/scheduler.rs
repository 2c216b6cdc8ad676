// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler: admission (`submit`) and dispatch (spec.md §4.6). Pairs the
//! FIFO `Queue` with a concurrency semaphore so the worker pool never runs
//! more than `max_concurrent_jobs` jobs at once.

use std::sync::Arc;

use ajob_adapters::{CowCloner, Impersonator};
use ajob_core::job::{JobId, JobState, TerminalReason};
use ajob_core::Clock;
use ajob_store::JobStore;
use tokio::sync::Semaphore;

use crate::cancel::CancelRegistry;
use crate::error::SchedulerError;
use crate::executor::JobExecutor;
use crate::queue::Queue;
use crate::registry::RepositoryRegistry;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub max_concurrent_jobs: usize,
}

/// Owns admission and dispatch. The executor is generic over the same
/// `Impersonator`/`CowCloner`/`Clock` triple as `JobExecutor` since the
/// scheduler's dispatch loop is what hands a popped job off to one.
pub struct Scheduler<I, C, Ck>
where
    I: Impersonator,
    C: CowCloner,
    Ck: Clock,
{
    queue: Arc<Queue>,
    store: Arc<JobStore>,
    registry: Arc<RepositoryRegistry<Ck>>,
    cancels: Arc<CancelRegistry>,
    executor: Arc<JobExecutor<I, C, Ck>>,
    semaphore: Arc<Semaphore>,
    clock: Ck,
}

impl<I, C, Ck> Scheduler<I, C, Ck>
where
    I: Impersonator,
    C: CowCloner,
    Ck: Clock,
{
    pub fn new(
        queue: Arc<Queue>,
        store: Arc<JobStore>,
        registry: Arc<RepositoryRegistry<Ck>>,
        cancels: Arc<CancelRegistry>,
        executor: Arc<JobExecutor<I, C, Ck>>,
        clock: Ck,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            queue,
            store,
            registry,
            cancels,
            executor,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1))),
            clock,
        }
    }

    /// Admits `job_id` to the queue. Rejects a job not in state `created`
    /// and duplicate submissions, per spec.md §4.6. Returns the job's
    /// 1-based queue position.
    pub fn submit(&self, job_id: JobId) -> Result<usize, SchedulerError> {
        let job = self
            .store
            .get(&job_id)
            .ok_or_else(|| SchedulerError::NotFound(job_id.clone()))?;
        if job.state != JobState::Created {
            return Err(SchedulerError::NotSubmittable(job.state));
        }

        let now = self.clock.now();
        self.store.patch(&job_id, |job| {
            job.state = JobState::Queued;
            job.queued_at = Some(now);
        })?;

        if !self.queue.submit(job_id.clone()) {
            return Err(SchedulerError::NotSubmittable(JobState::Queued));
        }

        Ok(self.queue.position_of(&job_id).unwrap_or(0))
    }

    /// Requests cancellation of `job_id`. Idempotent: a no-op on an already
    /// terminal job. Routes through whichever mechanism currently applies —
    /// the queue if still waiting, the `CancelRegistry` if a worker has it,
    /// or a direct store patch for the narrow window between the two.
    pub fn cancel_job(&self, job_id: &JobId) -> Result<bool, SchedulerError> {
        let job = self
            .store
            .get(job_id)
            .ok_or_else(|| SchedulerError::NotFound(job_id.clone()))?;
        if job.is_terminal() {
            return Ok(false);
        }

        let now = self.clock.now();
        if self.queue.cancel(job_id) {
            self.store.patch(job_id, |job| {
                job.terminate(JobState::Cancelled, Some(TerminalReason::Cancelled), now);
            })?;
            return Ok(true);
        }

        if self.cancels.is_registered(job_id) {
            self.cancels.request(job_id, TerminalReason::Cancelled);
            return Ok(true);
        }

        self.store.patch(job_id, |job| {
            if !job.is_terminal() {
                job.terminate(JobState::Cancelled, Some(TerminalReason::Cancelled), now);
            }
        })?;
        Ok(true)
    }

    pub fn queue_position(&self, job_id: &JobId) -> Option<usize> {
        self.queue.position_of(job_id)
    }

    /// Spawns the dispatch loop as a background task: pulls from the
    /// queue as concurrency permits free up, for as long as `self` lives.
    pub fn spawn_dispatch_loop(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                self.dispatch_one().await;
            }
        })
    }

    async fn dispatch_one(self: &Arc<Self>) {
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        let job_id = self.queue.take().await;

        let job = match self.store.get(&job_id) {
            Some(job) => job,
            None => return,
        };
        if job.is_terminal() {
            return;
        }
        if !self.registry.is_ready(&job.repository) {
            let now = self.clock.now();
            let _ = self.store.patch(&job_id, |job| {
                job.terminate(JobState::Failed, Some(TerminalReason::RepoGone), now);
            });
            return;
        }

        let executor = self.executor.clone();
        tokio::spawn(async move {
            executor.run_job(job_id).await;
            drop(permit);
        });
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
