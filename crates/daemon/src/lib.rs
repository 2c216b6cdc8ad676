// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ajob-daemon: configuration loading and the `Service` facade an
//! (out-of-scope) HTTP layer would call into, wiring together the
//! Repository Registry, Workspace Manager, Job Store, Scheduler, Job
//! Executor, and Janitor into one running process.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod logging;
pub mod service;

pub use config::{Config, ConfigError};
pub use error::ServiceError;
pub use logging::setup_logging;
pub use service::Service;

use std::sync::Arc;

use ajob_adapters::cloner::RealCloneProbe;
use ajob_adapters::impersonator::RealHostUserLookup;
use ajob_adapters::{RealCowCloner, RealImpersonator};
use ajob_core::{SystemClock, UuidIdGen};
use ajob_engine::executor::{ExecutorConfig, JobExecutor};
use ajob_engine::janitor::{Janitor, JanitorConfig};
use ajob_engine::scheduler::{Scheduler, SchedulerConfig};
use ajob_engine::{CancelRegistry, Queue, RepositoryRegistry, WorkspaceManager};
use ajob_store::JobStore;

/// The concrete production `Service`: real impersonation, real CoW cloning,
/// the system clock, and UUID job ids.
pub type ProductionService = Service<RealImpersonator, RealCowCloner, SystemClock, UuidIdGen>;

/// Wires up every production component from a loaded [`Config`], the way
/// the teacher's `lifecycle::startup` assembles a `DaemonState`.
///
/// The daemon is always the one running `RealHostUserLookup` in production
/// (real `getpwnam`); tests that need other identities substitute
/// `FakeHostUserLookup` behind the same `HostUserLookup` trait object one
/// level down, in `ajob-adapters`.
pub fn build(config: &Config) -> ProductionService {
    let clock = SystemClock;
    let store = Arc::new(JobStore::new(config.output_buffer_max_bytes));
    let registry = Arc::new(RepositoryRegistry::new(
        config.registry_root.clone(),
        clock.clone(),
    ));

    let probe = RealCloneProbe;
    let cloner = RealCowCloner::new(&probe, &config.workspace_root);
    let workspaces = Arc::new(WorkspaceManager::new(cloner, config.workspace_root.clone()));

    let queue = Arc::new(Queue::new());
    let cancels = Arc::new(CancelRegistry::new());
    let impersonator = RealImpersonator::new(
        config.impersonation_mode.clone(),
        Arc::new(RealHostUserLookup),
    );

    let executor = Arc::new(JobExecutor::new(
        impersonator,
        workspaces.clone(),
        registry.clone(),
        store.clone(),
        cancels.clone(),
        clock.clone(),
        ExecutorConfig {
            agent_program: config.agent_program.clone(),
            indexer_program: config.indexer_program.clone(),
            embedding_provider: config.embedding_provider.clone(),
            git_timeout: config.git_timeout,
            indexer_timeout: config.indexer_timeout,
            terminal_retention: config.terminal_retention,
        },
    ));

    let scheduler = Arc::new(Scheduler::new(
        queue.clone(),
        store.clone(),
        registry.clone(),
        cancels.clone(),
        executor,
        clock.clone(),
        SchedulerConfig {
            max_concurrent_jobs: config.max_concurrent_jobs,
        },
    ));

    let janitor = Arc::new(Janitor::new(
        store.clone(),
        queue,
        cancels,
        workspaces.clone(),
        clock.clone(),
        JanitorConfig {
            interval: config.janitor_interval,
            queue_wait_timeout: config.queue_wait_timeout,
            terminal_retention: config.terminal_retention,
            graceful_shutdown_timeout: config.graceful_shutdown_timeout,
        },
    ));

    Service::new(
        store,
        registry,
        workspaces,
        scheduler,
        janitor,
        clock,
        UuidIdGen,
        config.max_prompt_bytes,
    )
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
