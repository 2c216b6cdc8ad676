// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier, state machine, and the authoritative record the store holds.

use crate::owner::Username;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

pub use crate::id::JobId;

/// Default per-job timeout applied when a job does not specify one.
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// A job's position in its state machine.
///
/// `created → queued → cloning → (git-refreshing | skip) → (indexing | skip)
/// → running → {completed, failed, timed-out, cancelled}`. The last four are
/// terminal; no further transitions are valid once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, owner may still stage files. Covers both "no files staged
    /// yet" and "files staged, not yet submitted" — the spec names the
    /// latter `created-with-files-ready` but never gives it fields of its
    /// own, so both live here (see DESIGN.md).
    Created,
    Queued,
    Cloning,
    GitRefreshing,
    Indexing,
    Running,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::TimedOut | JobState::Cancelled
        )
    }

    /// True while the job occupies a worker slot and counts against
    /// `max_concurrent_jobs`.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            JobState::Cloning | JobState::GitRefreshing | JobState::Indexing | JobState::Running
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::Queued => "queued",
            JobState::Cloning => "cloning",
            JobState::GitRefreshing => "git-refreshing",
            JobState::Indexing => "indexing",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::TimedOut => "timed-out",
            JobState::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Why a job reached a terminal state other than a clean `completed`.
///
/// Mirrors the error-kind taxonomy one for one, so the output-tail marker is
/// produced by a single `Display` impl instead of being hand-formatted at
/// each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminalReason {
    Workspace,
    Git,
    AgentFailed,
    Timeout,
    Cancelled,
    RepoGone,
    /// Job exceeded `queue_wait_timeout` while still `queued`. See
    /// DESIGN.md for the decision to enforce this (the spec's own Open
    /// Questions leave enforcement ambiguous).
    Queue,
    Internal,
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminalReason::Workspace => "workspace",
            TerminalReason::Git => "git",
            TerminalReason::AgentFailed => "agent",
            TerminalReason::Timeout => "timeout",
            TerminalReason::Cancelled => "cancelled",
            TerminalReason::RepoGone => "repo-gone",
            TerminalReason::Queue => "queue",
            TerminalReason::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

/// Per-job options supplied at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOptions {
    pub timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub git_aware: bool,
    #[serde(default = "default_true")]
    pub index_aware: bool,
}

fn default_true() -> bool {
    true
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_JOB_TIMEOUT_SECS,
            git_aware: true,
            index_aware: true,
        }
    }
}

/// A file staged by the owner before or while the job is in state `created`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Whether the git-refresh step ran, and what it observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GitStatus {
    #[default]
    Skipped,
    Refreshed,
    Failed,
}

/// Whether the indexer was reachable and reconciled successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    #[default]
    Skipped,
    Ready,
    Unavailable,
}

/// Configuration for creating a new job, as handed to the store by the
/// (out-of-scope) HTTP collaborator after it has authenticated the caller.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub id: JobId,
    pub owner: Username,
    pub prompt: String,
    pub repository: String,
    pub options: JobOptions,
}

/// A job instance: the unit of work the whole service exists to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner: Username,
    pub prompt: String,
    pub repository: String,
    pub options: JobOptions,
    pub staged_files: Vec<StagedFile>,

    pub state: JobState,
    /// 1-based position while `queued`; absent otherwise.
    pub queue_position: Option<usize>,
    pub workspace_path: Option<std::path::PathBuf>,
    pub captured_output: String,
    pub output_truncated: bool,
    pub exit_code: Option<i32>,
    pub git_status: GitStatus,
    pub index_status: IndexStatus,
    pub terminal_reason: Option<TerminalReason>,

    #[serde(with = "crate::time_fmt::serde_systemtime")]
    pub created_at: SystemTime,
    /// Set when the job enters `queued`, for `queue_wait_timeout`
    /// enforcement (see DESIGN.md's Open Question decision).
    #[serde(with = "crate::time_fmt::serde_systemtime_opt")]
    pub queued_at: Option<SystemTime>,
    #[serde(with = "crate::time_fmt::serde_systemtime_opt")]
    pub started_at: Option<SystemTime>,
    #[serde(with = "crate::time_fmt::serde_systemtime_opt")]
    pub ended_at: Option<SystemTime>,
    /// The one field this crate's Terminal Monotonicity invariant allows to
    /// mutate after a terminal transition.
    #[serde(with = "crate::time_fmt::serde_systemtime_opt")]
    pub retention_reaped_at: Option<SystemTime>,
}

impl Job {
    pub fn new(config: JobConfig, created_at: SystemTime) -> Self {
        Self {
            id: config.id,
            owner: config.owner,
            prompt: config.prompt,
            repository: config.repository,
            options: config.options,
            staged_files: Vec::new(),
            state: JobState::Created,
            queue_position: None,
            workspace_path: None,
            captured_output: String::new(),
            output_truncated: false,
            exit_code: None,
            git_status: GitStatus::default(),
            index_status: IndexStatus::default(),
            terminal_reason: None,
            created_at,
            queued_at: None,
            started_at: None,
            ended_at: None,
            retention_reaped_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Moves the job to a terminal state, recording the reason (unless this
    /// is a clean completion) and the end timestamp. No-op if already
    /// terminal, upholding idempotency of cancel/timeout/delete.
    pub fn terminate(&mut self, state: JobState, reason: Option<TerminalReason>, now: SystemTime) {
        if self.is_terminal() {
            return;
        }
        debug_assert!(state.is_terminal());
        self.state = state;
        self.terminal_reason = reason;
        self.ended_at = Some(now);
        self.queue_position = None;
    }

    /// Appends a reason marker to the captured output tail, per §7's
    /// user-visible-behavior rule that non-completed terminal jobs carry
    /// their reason in the output.
    pub fn output_with_reason_marker(&self) -> String {
        match self.terminal_reason {
            Some(reason) if self.is_terminal() => {
                format!("{}\n[terminal reason: {}]", self.captured_output, reason)
            }
            _ => self.captured_output.clone(),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
