// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job Executor: drives one dispatched job linearly through cloning, the
//! optional git and indexing steps, the agent invocation, and teardown
//! (spec.md §4.7). Every error path funnels through `terminate`.

use std::path::Path;
use std::time::Duration;

use ajob_adapters::{CowCloner, Impersonator, ProcessHandle, RunOutcome, RunRequest};
use ajob_core::job::{GitStatus, Job, JobId, JobState, TerminalReason};
use ajob_core::Clock;
use ajob_store::JobStore;
use tokio::sync::Notify;

use crate::cancel::CancelRegistry;
use crate::error::ExecutorError;
use crate::indexer;
use crate::registry::RepositoryRegistry;
use crate::system_prompt;
use crate::workspace::WorkspaceManager;

/// Binary names and per-phase timeouts the executor needs that are not
/// themselves part of a single job's options.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub agent_program: String,
    pub indexer_program: String,
    pub embedding_provider: String,
    pub git_timeout: Duration,
    pub indexer_timeout: Duration,
    /// Zero means destroy the workspace immediately on every terminal
    /// transition; non-zero defers destruction to the Janitor's retention
    /// sweep.
    pub terminal_retention: Duration,
}

/// Outcome of one impersonated phase, narrowed to what the state machine
/// needs to decide its next transition.
enum PhaseOutcome {
    Exited(i32),
    Interrupted(TerminalReason),
}

fn terminal_state_for(reason: TerminalReason) -> JobState {
    match reason {
        TerminalReason::Timeout => JobState::TimedOut,
        TerminalReason::Cancelled | TerminalReason::Queue => JobState::Cancelled,
        TerminalReason::Workspace
        | TerminalReason::Git
        | TerminalReason::AgentFailed
        | TerminalReason::RepoGone
        | TerminalReason::Internal => JobState::Failed,
    }
}

pub struct JobExecutor<I, C: CowCloner, Ck: Clock> {
    impersonator: I,
    workspaces: std::sync::Arc<WorkspaceManager<C>>,
    registry: std::sync::Arc<RepositoryRegistry<Ck>>,
    store: std::sync::Arc<JobStore>,
    cancels: std::sync::Arc<CancelRegistry>,
    clock: Ck,
    config: ExecutorConfig,
}

impl<I, C, Ck> JobExecutor<I, C, Ck>
where
    I: Impersonator,
    C: CowCloner,
    Ck: Clock,
{
    pub fn new(
        impersonator: I,
        workspaces: std::sync::Arc<WorkspaceManager<C>>,
        registry: std::sync::Arc<RepositoryRegistry<Ck>>,
        store: std::sync::Arc<JobStore>,
        cancels: std::sync::Arc<CancelRegistry>,
        clock: Ck,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            impersonator,
            workspaces,
            registry,
            store,
            cancels,
            clock,
            config,
        }
    }

    /// Drives `job_id` from `queued` to a terminal state. Never returns an
    /// error to the caller — every failure path here funnels through
    /// `terminate`, per spec.md §7's propagation policy, so a bug in one
    /// job's pipeline can never take down the worker that's running it.
    pub async fn run_job(&self, job_id: JobId) {
        let notify = self.cancels.register(&job_id);
        if let Err(e) = self.run_job_inner(&job_id, &notify).await {
            tracing::error!(job = job_id.as_str(), error = %e, "executor hit an internal error");
            self.terminate(&job_id, JobState::Failed, Some(TerminalReason::Internal), false)
                .await;
        }
        self.cancels.deregister(&job_id);
    }

    async fn run_job_inner(&self, job_id: &JobId, notify: &Notify) -> Result<(), ExecutorError> {
        let now = self.clock.now();
        let job = self.store.patch(job_id, |job| {
            job.state = JobState::Cloning;
            job.started_at = Some(now);
        })?;

        let source = match self.registry.ready_path(&job.repository) {
            Ok(path) => path,
            Err(_) => {
                self.terminate(job_id, JobState::Failed, Some(TerminalReason::RepoGone), false)
                    .await;
                return Ok(());
            }
        };

        let workspace_path = match self.workspaces.create(job_id, &source).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(job = job_id.as_str(), error = %e, "workspace creation failed");
                self.terminate(job_id, JobState::Failed, Some(TerminalReason::Workspace), false)
                    .await;
                return Ok(());
            }
        };
        let job = self
            .store
            .patch(job_id, |job| job.workspace_path = Some(workspace_path.clone()))?;

        if job.options.git_aware {
            let git_dir = workspace_path.join(".git");
            let has_git_dir = tokio::fs::try_exists(&git_dir).await.unwrap_or(false);
            if has_git_dir && self.git_has_remote(&workspace_path, &job).await {
                self.store.patch(job_id, |job| job.state = JobState::GitRefreshing)?;
                match self.git_pull(job_id, &workspace_path, &job, notify).await? {
                    PhaseOutcome::Exited(0) => {
                        self.store.patch(job_id, |job| job.git_status = GitStatus::Refreshed)?;
                    }
                    PhaseOutcome::Exited(_) => {
                        self.terminate(job_id, JobState::Failed, Some(TerminalReason::Git), false)
                            .await;
                        return Ok(());
                    }
                    PhaseOutcome::Interrupted(reason) => {
                        self.terminate(job_id, terminal_state_for(reason), Some(reason), false)
                            .await;
                        return Ok(());
                    }
                }
            }
        }

        let mut index_started = false;
        if job.options.index_aware {
            self.store.patch(job_id, |job| job.state = JobState::Indexing)?;
            if let Some(reason) = self
                .run_indexer_lifecycle(job_id, &workspace_path, &job, notify, &mut index_started)
                .await?
            {
                self.terminate(job_id, terminal_state_for(reason), Some(reason), index_started)
                    .await;
                return Ok(());
            }
        }

        self.store.patch(job_id, |job| job.state = JobState::Running)?;
        let job = self.store.get(job_id).ok_or_else(|| ExecutorError::Internal(job_id.to_string()))?;

        let request = RunRequest {
            target_user: job.owner.as_str().to_string(),
            working_dir: workspace_path.clone(),
            program: self.config.agent_program.clone(),
            args: vec![system_prompt::fragment_for(job.index_status).to_string()],
            stdin_bytes: job.prompt.clone().into_bytes(),
            env_overrides: Vec::new(),
            timeout: Duration::from_secs(job.options.timeout_seconds),
        };

        match self.run_phase(job_id, notify, request, true).await? {
            PhaseOutcome::Exited(0) => {
                self.store.patch(job_id, |job| job.exit_code = Some(0))?;
                self.terminate(job_id, JobState::Completed, None, index_started).await;
            }
            PhaseOutcome::Exited(code) => {
                self.store.patch(job_id, |job| job.exit_code = Some(code))?;
                self.terminate(job_id, JobState::Failed, Some(TerminalReason::AgentFailed), index_started)
                    .await;
            }
            PhaseOutcome::Interrupted(reason) => {
                self.terminate(job_id, terminal_state_for(reason), Some(reason), index_started)
                    .await;
            }
        }

        Ok(())
    }

    /// Runs indexer start, then index-reconcile, then a status probe. Any
    /// ordinary (non-zero exit) failure is absorbed into
    /// `IndexStatus::Unavailable` per spec.md §4.7 — only a genuine
    /// external cancel or timeout is propagated as a terminal reason.
    async fn run_indexer_lifecycle(
        &self,
        job_id: &JobId,
        workspace_path: &Path,
        job: &Job,
        notify: &Notify,
        index_started: &mut bool,
    ) -> Result<Option<TerminalReason>, ExecutorError> {
        let start_req = self.indexer_request(workspace_path, job, vec!["start".to_string()]);
        match self.run_phase(job_id, notify, start_req, false).await? {
            PhaseOutcome::Exited(0) => *index_started = true,
            PhaseOutcome::Exited(code) => {
                tracing::warn!(job = job_id.as_str(), exit_code = code, "indexer start failed");
            }
            PhaseOutcome::Interrupted(reason) => return Ok(Some(reason)),
        }

        let mut reconciled = false;
        if *index_started {
            let reconcile_req = self.indexer_request(
                workspace_path,
                job,
                vec![
                    "index-reconcile".to_string(),
                    "--embedding-provider".to_string(),
                    self.config.embedding_provider.clone(),
                ],
            );
            match self.run_phase(job_id, notify, reconcile_req, false).await? {
                PhaseOutcome::Exited(0) => reconciled = true,
                PhaseOutcome::Exited(code) => {
                    tracing::warn!(job = job_id.as_str(), exit_code = code, "indexer reconcile failed");
                }
                PhaseOutcome::Interrupted(reason) => return Ok(Some(reason)),
            }
        }

        let mut ready = false;
        if reconciled {
            let status_req = self.indexer_request(workspace_path, job, vec!["status".to_string()]);
            if let Ok(handle) = self.impersonator.run(status_req).await {
                let (outcome, buf) = run_collecting(handle).await;
                if matches!(outcome, RunOutcome::Exited(0)) {
                    ready = indexer::all_components_ready(&String::from_utf8_lossy(&buf));
                }
            }
        }

        self.store.patch(job_id, |job| {
            job.index_status = if ready {
                ajob_core::job::IndexStatus::Ready
            } else {
                ajob_core::job::IndexStatus::Unavailable
            };
        })?;

        Ok(None)
    }

    fn indexer_request(&self, workspace_path: &Path, job: &Job, args: Vec<String>) -> RunRequest {
        RunRequest {
            target_user: job.owner.as_str().to_string(),
            working_dir: workspace_path.to_path_buf(),
            program: self.config.indexer_program.clone(),
            args,
            stdin_bytes: Vec::new(),
            env_overrides: Vec::new(),
            timeout: self.config.indexer_timeout,
        }
    }

    async fn git_has_remote(&self, workspace_path: &Path, job: &Job) -> bool {
        let request = RunRequest {
            target_user: job.owner.as_str().to_string(),
            working_dir: workspace_path.to_path_buf(),
            program: "git".to_string(),
            args: vec!["remote".to_string()],
            stdin_bytes: Vec::new(),
            env_overrides: Vec::new(),
            timeout: self.config.git_timeout,
        };
        match self.impersonator.run(request).await {
            Ok(handle) => {
                let (outcome, buf) = run_collecting(handle).await;
                matches!(outcome, RunOutcome::Exited(0)) && !buf.iter().all(u8::is_ascii_whitespace)
            }
            Err(_) => false,
        }
    }

    async fn git_pull(
        &self,
        job_id: &JobId,
        workspace_path: &Path,
        job: &Job,
        notify: &Notify,
    ) -> Result<PhaseOutcome, ExecutorError> {
        let request = RunRequest {
            target_user: job.owner.as_str().to_string(),
            working_dir: workspace_path.to_path_buf(),
            program: "git".to_string(),
            args: vec!["pull".to_string()],
            stdin_bytes: Vec::new(),
            env_overrides: Vec::new(),
            timeout: self.config.git_timeout,
        };
        self.run_phase(job_id, notify, request, false).await
    }

    /// Launches `request`, streams its output into the store when `capture`
    /// is set, and races its natural completion against an external cancel
    /// signal, mirroring the impersonator's own `terminate_then_kill` race.
    async fn run_phase(
        &self,
        job_id: &JobId,
        notify: &Notify,
        request: RunRequest,
        capture: bool,
    ) -> Result<PhaseOutcome, ExecutorError> {
        let handle = self
            .impersonator
            .run(request)
            .await
            .map_err(|e| ExecutorError::Impersonator(e.to_string()))?;

        let cancel_token = handle.cancel_token();
        let store = self.store.clone();
        let jid = job_id.clone();
        let mut driver = tokio::spawn(async move {
            let mut handle = handle;
            while let Some(chunk) = handle.output.recv().await {
                if capture {
                    let _ = store.append_output(&jid, &chunk);
                }
            }
            handle.wait().await
        });

        let outcome = tokio::select! {
            result = &mut driver => result.unwrap_or(RunOutcome::Exited(-1)),
            _ = notify.notified() => {
                cancel_token.cancel();
                driver.await.unwrap_or(RunOutcome::Exited(-1))
            }
        };

        Ok(match outcome {
            RunOutcome::Exited(code) => PhaseOutcome::Exited(code),
            RunOutcome::TimedOut => PhaseOutcome::Interrupted(TerminalReason::Timeout),
            RunOutcome::Cancelled => PhaseOutcome::Interrupted(
                self.cancels.taken_reason(job_id).unwrap_or(TerminalReason::Cancelled),
            ),
        })
    }

    /// Records the terminal transition, then best-effort indexer teardown,
    /// then either destroys the workspace now or leaves it for the Janitor.
    async fn terminate(
        &self,
        job_id: &JobId,
        state: JobState,
        reason: Option<TerminalReason>,
        index_started: bool,
    ) {
        let now = self.clock.now();
        let job = match self.store.patch(job_id, |job| job.terminate(state, reason, now)) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(job = job_id.as_str(), error = %e, "terminate on a job missing from the store");
                return;
            }
        };

        if index_started {
            if let Some(workspace_path) = job.workspace_path.clone() {
                self.stop_indexer_best_effort(job_id, &workspace_path, &job).await;
            }
        }

        if self.config.terminal_retention.is_zero() {
            if let Err(e) = self.workspaces.destroy(job_id).await {
                tracing::warn!(job = job_id.as_str(), error = %e, "workspace teardown failed");
            }
        }
    }

    async fn stop_indexer_best_effort(&self, job_id: &JobId, workspace_path: &Path, job: &Job) {
        let request = self.indexer_request(workspace_path, job, vec!["stop".to_string()]);
        match self.impersonator.run(request).await {
            Ok(handle) => {
                let (outcome, _) = run_collecting(handle).await;
                if !matches!(outcome, RunOutcome::Exited(0)) {
                    tracing::warn!(job = job_id.as_str(), "indexer stop reported failure");
                }
            }
            Err(e) => {
                tracing::warn!(job = job_id.as_str(), error = %e, "indexer stop failed to launch");
            }
        }
    }
}

/// Drains a handle's output without streaming it anywhere, for the short
/// probe-style invocations (git remote listing, indexer status) that never
/// need to race a cancel signal.
async fn run_collecting(mut handle: ProcessHandle) -> (RunOutcome, Vec<u8>) {
    let mut buf = Vec::new();
    while let Some(chunk) = handle.output.recv().await {
        buf.extend_from_slice(&chunk);
    }
    let outcome = handle.wait().await;
    (outcome, buf)
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
