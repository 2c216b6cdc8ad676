// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ajob-adapters: the CoW Cloner and the Impersonator — the two seams where
//! this service touches the host filesystem and the host identity database.

pub mod cloner;
pub mod impersonator;
pub mod subprocess;

pub use cloner::{CloneMethod, CloneProbe, ClonerError, CowCloner, RealCowCloner};
pub use impersonator::{
    CancelToken, HostUser, HostUserLookup, ImpersonationMode, Impersonator, ImpersonatorError,
    ProcessHandle, RealImpersonator, RunOutcome, RunRequest,
};

#[cfg(any(test, feature = "test-support"))]
pub use cloner::FakeCowCloner;
#[cfg(any(test, feature = "test-support"))]
pub use impersonator::{FakeHostUserLookup, FakeImpersonator, ImpersonatorCall};
