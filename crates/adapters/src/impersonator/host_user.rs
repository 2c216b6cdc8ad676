// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolving a configured username to the OS identity the impersonator
//! switches into.

use std::path::PathBuf;

use super::ImpersonatorError;

/// The pieces of a host account the impersonator needs to run a process as
/// that user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostUser {
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
    pub shell: PathBuf,
}

/// Resolves a username to a [`HostUser`]. Split out from the impersonator
/// itself so tests can supply users that don't exist on the host running
/// the test suite.
pub trait HostUserLookup: Send + Sync + 'static {
    fn lookup(&self, username: &str) -> Result<HostUser, ImpersonatorError>;
}

/// Looks users up via `getpwnam`, the same mechanism `su`/`sudo` use.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealHostUserLookup;

impl HostUserLookup for RealHostUserLookup {
    fn lookup(&self, username: &str) -> Result<HostUser, ImpersonatorError> {
        let user = nix::unistd::User::from_name(username)
            .map_err(|e| ImpersonatorError::SpawnFailed(e.to_string()))?
            .ok_or_else(|| ImpersonatorError::UnknownUser(username.to_string()))?;

        Ok(HostUser {
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
            shell: user.shell,
        })
    }
}
