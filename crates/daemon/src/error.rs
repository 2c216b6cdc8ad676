// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ajob_core::job::JobId;
use ajob_core::ValidationError;
use ajob_engine::error::SchedulerError;
use ajob_engine::{RegistryError, WorkspaceError};
use ajob_store::StoreError;
use thiserror::Error;

/// The single seam every `Service` method funnels its failures through,
/// composing the per-crate error enums the way `oj-engine::ExecuteError`
/// composes `SessionError`/`AgentError`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("job {0} not found")]
    JobNotFound(JobId),
}
