// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Janitor: the periodic sweep for per-job timeouts, `queue_wait_timeout`,
//! terminal-job retention, and the graceful-shutdown drain (spec.md §4.8).

use std::sync::Arc;
use std::time::Duration;

use ajob_adapters::CowCloner;
use ajob_core::job::{JobState, TerminalReason};
use ajob_core::Clock;
use ajob_store::JobStore;

use crate::cancel::CancelRegistry;
use crate::queue::Queue;
use crate::workspace::WorkspaceManager;

#[derive(Debug, Clone, Copy)]
pub struct JanitorConfig {
    pub interval: Duration,
    pub queue_wait_timeout: Duration,
    pub terminal_retention: Duration,
    pub graceful_shutdown_timeout: Duration,
}

pub struct Janitor<C, Ck>
where
    C: CowCloner,
    Ck: Clock,
{
    store: Arc<JobStore>,
    queue: Arc<Queue>,
    cancels: Arc<CancelRegistry>,
    workspaces: Arc<WorkspaceManager<C>>,
    clock: Ck,
    config: JanitorConfig,
}

impl<C, Ck> Janitor<C, Ck>
where
    C: CowCloner,
    Ck: Clock,
{
    pub fn new(
        store: Arc<JobStore>,
        queue: Arc<Queue>,
        cancels: Arc<CancelRegistry>,
        workspaces: Arc<WorkspaceManager<C>>,
        clock: Ck,
        config: JanitorConfig,
    ) -> Self {
        Self {
            store,
            queue,
            cancels,
            workspaces,
            clock,
            config,
        }
    }

    /// Spawns the periodic sweep as a background task.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }

    pub async fn sweep(&self) {
        self.sweep_timeouts().await;
        self.sweep_queue_wait();
        self.sweep_retention().await;
    }

    async fn sweep_timeouts(&self) {
        let now = self.clock.now();
        for job in self.store.all() {
            if job.is_terminal() {
                continue;
            }
            let Some(started) = job.started_at else {
                continue;
            };
            let elapsed = now.duration_since(started).unwrap_or_default();
            if elapsed >= Duration::from_secs(job.options.timeout_seconds) {
                self.force_timeout(&job.id);
            }
        }
    }

    fn force_timeout(&self, job_id: &ajob_core::job::JobId) {
        if self.cancels.is_registered(job_id) {
            self.cancels.request(job_id, TerminalReason::Timeout);
            return;
        }
        let now = self.clock.now();
        let _ = self.store.patch(job_id, |job| {
            if !job.is_terminal() {
                job.terminate(JobState::TimedOut, Some(TerminalReason::Timeout), now);
            }
        });
    }

    /// Enforces `queue_wait_timeout` (see DESIGN.md's Open Question
    /// decision): a job still `queued` past this long fails with reason
    /// "queue" instead of waiting on a worker slot forever.
    fn sweep_queue_wait(&self) {
        let now = self.clock.now();
        for job in self.store.list_queued_ordered() {
            let Some(queued_at) = job.queued_at else {
                continue;
            };
            let elapsed = now.duration_since(queued_at).unwrap_or_default();
            if elapsed < self.config.queue_wait_timeout {
                continue;
            }
            self.queue.cancel(&job.id);
            let _ = self.store.patch(&job.id, |job| {
                if !job.is_terminal() {
                    job.terminate(JobState::Failed, Some(TerminalReason::Queue), now);
                }
            });
        }
    }

    async fn sweep_retention(&self) {
        if self.config.terminal_retention.is_zero() {
            return;
        }
        let now = self.clock.now();
        for job in self.store.all() {
            if !job.is_terminal() {
                continue;
            }
            let Some(ended) = job.ended_at else {
                continue;
            };
            if now.duration_since(ended).unwrap_or_default() < self.config.terminal_retention {
                continue;
            }
            let _ = self.store.patch(&job.id, |job| job.retention_reaped_at = Some(now));
            if let Err(e) = self.workspaces.destroy(&job.id).await {
                tracing::warn!(job = job.id.as_str(), error = %e, "retention teardown failed");
            }
            self.store.remove(&job.id);
        }
    }

    /// Cancels every non-terminal job, waits up to
    /// `graceful_shutdown_timeout` for the worker pool to drain, then
    /// unconditionally tears down whatever workspaces remain.
    pub async fn shutdown(&self) {
        let now = self.clock.now();
        for job in self.store.all() {
            if job.is_terminal() {
                continue;
            }
            self.queue.cancel(&job.id);
            if self.cancels.is_registered(&job.id) {
                self.cancels.request(&job.id, TerminalReason::Cancelled);
            } else {
                let _ = self.store.patch(&job.id, |job| {
                    if !job.is_terminal() {
                        job.terminate(JobState::Cancelled, Some(TerminalReason::Cancelled), now);
                    }
                });
            }
        }

        let start = tokio::time::Instant::now();
        while start.elapsed() < self.config.graceful_shutdown_timeout {
            if self.store.all().iter().all(|job| job.is_terminal()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let now = self.clock.now();
        for job in self.store.all() {
            if !job.is_terminal() {
                let _ = self.store.patch(&job.id, |job| {
                    job.terminate(JobState::Cancelled, Some(TerminalReason::Cancelled), now);
                });
            }
            if let Err(e) = self.workspaces.destroy(&job.id).await {
                tracing::warn!(job = job.id.as_str(), error = %e, "shutdown teardown failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "janitor_tests.rs"]
mod tests;
