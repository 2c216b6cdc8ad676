// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The facade an (out-of-scope) HTTP collaborator calls into: spec.md §6's
//! inbound operation table, minus `Authenticate`, which belongs to that
//! collaborator rather than to this service.

use std::path::PathBuf;
use std::sync::Arc;

use ajob_adapters::{CowCloner, Impersonator};
use ajob_core::error::validate_prompt;
use ajob_core::job::{Job, JobConfig, JobId, JobOptions, StagedFile};
use ajob_core::repository::{RegisteredRepository, RepositoryName};
use ajob_core::{Clock, IdGen, Username};
use ajob_engine::janitor::Janitor;
use ajob_engine::registry::RepositoryRegistry;
use ajob_engine::scheduler::Scheduler;
use ajob_engine::workspace::WorkspaceManager;
use ajob_store::JobStore;

use crate::error::ServiceError;

/// Owns every long-lived component and exposes them as one coherent API.
/// Generic the same way `JobExecutor`/`Scheduler` are, plus an `IdGen` for
/// minting job ids at creation time.
pub struct Service<I, C, Ck, G>
where
    I: Impersonator,
    C: CowCloner,
    Ck: Clock,
    G: IdGen,
{
    store: Arc<JobStore>,
    registry: Arc<RepositoryRegistry<Ck>>,
    workspaces: Arc<WorkspaceManager<C>>,
    scheduler: Arc<Scheduler<I, C, Ck>>,
    janitor: Arc<Janitor<C, Ck>>,
    clock: Ck,
    ids: G,
    max_prompt_bytes: usize,
}

impl<I, C, Ck, G> Service<I, C, Ck, G>
where
    I: Impersonator,
    C: CowCloner,
    Ck: Clock,
    G: IdGen,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<JobStore>,
        registry: Arc<RepositoryRegistry<Ck>>,
        workspaces: Arc<WorkspaceManager<C>>,
        scheduler: Arc<Scheduler<I, C, Ck>>,
        janitor: Arc<Janitor<C, Ck>>,
        clock: Ck,
        ids: G,
        max_prompt_bytes: usize,
    ) -> Self {
        Self {
            store,
            registry,
            workspaces,
            scheduler,
            janitor,
            clock,
            ids,
            max_prompt_bytes,
        }
    }

    /// Handle to the Scheduler, for spawning its dispatch loop at startup.
    pub fn scheduler(&self) -> Arc<Scheduler<I, C, Ck>> {
        self.scheduler.clone()
    }

    /// Handle to the Janitor, for spawning its sweep loop and driving
    /// graceful shutdown at startup/teardown.
    pub fn janitor(&self) -> Arc<Janitor<C, Ck>> {
        self.janitor.clone()
    }

    /// Creates a job in state `created`. The caller (the out-of-scope HTTP
    /// collaborator) is responsible for resolving `owner` from whatever
    /// session token `Authenticate` issued; this service only records it.
    pub fn create_job(
        &self,
        owner: Username,
        prompt: String,
        repository: String,
        options: JobOptions,
    ) -> Result<JobId, ServiceError> {
        validate_prompt(&prompt, self.max_prompt_bytes)?;

        let job_id = JobId::new(self.ids.next());
        let job = Job::new(
            JobConfig {
                id: job_id.clone(),
                owner,
                prompt,
                repository,
                options,
            },
            self.clock.now(),
        );
        self.store.put(job);
        Ok(job_id)
    }

    /// Stages a file for `job_id`, to land under `<workspace>/files/` once
    /// the job starts. Valid any time before the job's workspace is torn
    /// down.
    pub fn stage_file(
        &self,
        job_id: &JobId,
        filename: String,
        content: Vec<u8>,
    ) -> Result<(), ServiceError> {
        self.get_job(job_id)?;
        self.workspaces
            .stage_file(job_id, StagedFile { filename, content })?;
        Ok(())
    }

    /// Admits `job_id` to the queue, returning its 1-based position.
    pub fn start_job(&self, job_id: &JobId) -> Result<usize, ServiceError> {
        Ok(self.scheduler.submit(job_id.clone())?)
    }

    /// A full status snapshot, per spec.md §6's `Get job` row: the stored
    /// job with its live queue position (the store only knows the field
    /// it last wrote, not where the queue has moved since) and, per §7,
    /// the terminal reason folded into the captured-output tail whenever
    /// the job didn't simply complete.
    pub fn get_job(&self, job_id: &JobId) -> Result<Job, ServiceError> {
        let mut job = self
            .store
            .get(job_id)
            .ok_or_else(|| ServiceError::JobNotFound(job_id.clone()))?;
        job.queue_position = self.scheduler.queue_position(job_id);
        job.captured_output = job.output_with_reason_marker();
        Ok(job)
    }

    /// Requests cancellation; idempotent on an already-terminal job.
    pub fn cancel_job(&self, job_id: &JobId) -> Result<bool, ServiceError> {
        Ok(self.scheduler.cancel_job(job_id)?)
    }

    /// Cancel-if-running, then unconditional workspace teardown and store
    /// removal, per spec.md §6's `Delete job` row.
    pub async fn delete_job(&self, job_id: &JobId) -> Result<(), ServiceError> {
        self.get_job(job_id)?;
        self.cancel_job(job_id)?;
        self.workspaces.destroy(job_id).await?;
        self.store.remove(job_id);
        Ok(())
    }

    pub fn list_jobs_for_owner(&self, owner: &Username) -> Vec<Job> {
        self.store.list_by_owner(owner)
    }

    pub async fn register_repository(
        &self,
        name: RepositoryName,
        upstream: Option<String>,
        local_path: Option<PathBuf>,
    ) -> Result<RegisteredRepository, ServiceError> {
        Ok(self.registry.register(name, upstream, local_path).await?)
    }

    pub fn list_repositories(&self) -> Vec<RegisteredRepository> {
        self.registry.list()
    }

    pub async fn unregister_repository(&self, name: &str) -> Result<(), ServiceError> {
        Ok(self.registry.unregister(name).await?)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
