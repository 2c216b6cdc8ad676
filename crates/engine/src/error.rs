// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ajob_adapters::ClonerError;
use ajob_core::job::{JobId, JobState};
use ajob_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("repository name already registered: {0}")]
    AlreadyRegistered(String),
    #[error("repository not found: {0}")]
    NotFound(String),
    #[error("repository is not ready (status: {0})")]
    NotReady(String),
    #[error("clone failed: {0}")]
    CloneFailed(String),
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Clone(#[from] ClonerError),
    #[error("workspace already exists for job: {0}")]
    AlreadyExists(JobId),
    #[error("no workspace for job: {0}")]
    NotFound(JobId),
    #[error("illegal staged filename: {0}")]
    IllegalFilename(String),
    #[error("path {0:?} escapes the workspace root")]
    PathEscapesWorkspace(String),
    #[error("filesystem error: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("impersonator error: {0}")]
    Impersonator(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job in state {0} cannot be submitted")]
    NotSubmittable(JobState),
    #[error(transparent)]
    Store(#[from] StoreError),
}
