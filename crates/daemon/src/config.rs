// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: every tunable spec.md §6 enumerates, loaded from
//! the environment with baked-in defaults, following the teacher's
//! `Config::load()` shape.

use std::path::PathBuf;
use std::time::Duration;

use ajob_adapters::ImpersonationMode;
use ajob_core::job::DEFAULT_JOB_TIMEOUT_SECS;
use thiserror::Error;

const DEFAULT_MAX_CONCURRENT_JOBS: usize = 5;
const DEFAULT_QUEUE_WAIT_TIMEOUT_SECS: u64 = 60 * 60;
const DEFAULT_JANITOR_INTERVAL_SECS: u64 = 60;
const DEFAULT_TERMINAL_RETENTION_SECS: u64 = 0;
const DEFAULT_OUTPUT_BUFFER_MAX_BYTES: usize = 1024 * 1024;
const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_PROMPT_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set to an absolute path")]
    MissingPath(&'static str),
    #[error("{0}={1:?} is not a valid integer")]
    InvalidInt(&'static str, String),
    #[error("impersonation_mode={0:?} is not one of superuser-switch, elevation-rule")]
    InvalidImpersonationMode(String),
    #[error("impersonation_mode=elevation-rule requires elevation_command to be set")]
    MissingElevationCommand,
}

/// Every tunable the daemon needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub registry_root: PathBuf,
    pub workspace_root: PathBuf,
    pub log_path: PathBuf,
    pub max_concurrent_jobs: usize,
    pub default_job_timeout: Duration,
    pub queue_wait_timeout: Duration,
    pub janitor_interval: Duration,
    pub terminal_retention: Duration,
    pub graceful_shutdown_timeout: Duration,
    pub output_buffer_max_bytes: usize,
    pub max_prompt_bytes: usize,
    pub impersonation_mode: ImpersonationMode,
    pub agent_program: String,
    pub indexer_program: String,
    pub embedding_provider: String,
    pub git_timeout: Duration,
    pub indexer_timeout: Duration,
}

impl Config {
    /// Loads configuration from the process environment. `registry_root`
    /// and `workspace_root` have no sensible default (spec.md §6 calls
    /// both out as required absolute paths) and are the only values that
    /// can fail to load; everything else falls back to the defaults named
    /// in spec.md §6 and the indexer/agent wiring this crate adds.
    pub fn load() -> Result<Self, ConfigError> {
        let registry_root = required_path("AJOB_REGISTRY_ROOT")?;
        let workspace_root = required_path("AJOB_WORKSPACE_ROOT")?;
        let log_path = optional_path("AJOB_LOG_PATH")
            .unwrap_or_else(|| workspace_root.join("..").join("ajobd.log"));

        Ok(Self {
            registry_root,
            workspace_root,
            log_path,
            max_concurrent_jobs: parse_env_or(
                "AJOB_MAX_CONCURRENT_JOBS",
                DEFAULT_MAX_CONCURRENT_JOBS,
            )?,
            default_job_timeout: Duration::from_secs(parse_env_or(
                "AJOB_DEFAULT_JOB_TIMEOUT_SECS",
                DEFAULT_JOB_TIMEOUT_SECS,
            )?),
            queue_wait_timeout: Duration::from_secs(parse_env_or(
                "AJOB_QUEUE_WAIT_TIMEOUT_SECS",
                DEFAULT_QUEUE_WAIT_TIMEOUT_SECS,
            )?),
            janitor_interval: Duration::from_secs(parse_env_or(
                "AJOB_JANITOR_INTERVAL_SECS",
                DEFAULT_JANITOR_INTERVAL_SECS,
            )?),
            terminal_retention: Duration::from_secs(parse_env_or(
                "AJOB_TERMINAL_RETENTION_SECS",
                DEFAULT_TERMINAL_RETENTION_SECS,
            )?),
            graceful_shutdown_timeout: Duration::from_secs(parse_env_or(
                "AJOB_GRACEFUL_SHUTDOWN_TIMEOUT_SECS",
                DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECS,
            )?),
            output_buffer_max_bytes: parse_env_or(
                "AJOB_OUTPUT_BUFFER_MAX_BYTES",
                DEFAULT_OUTPUT_BUFFER_MAX_BYTES,
            )?,
            max_prompt_bytes: parse_env_or("AJOB_MAX_PROMPT_BYTES", DEFAULT_MAX_PROMPT_BYTES)?,
            impersonation_mode: load_impersonation_mode()?,
            agent_program: std::env::var("AJOB_AGENT_PROGRAM")
                .unwrap_or_else(|_| "agent".to_string()),
            indexer_program: std::env::var("AJOB_INDEXER_PROGRAM")
                .unwrap_or_else(|_| "indexer".to_string()),
            embedding_provider: std::env::var("AJOB_EMBEDDING_PROVIDER")
                .unwrap_or_else(|_| "local".to_string()),
            git_timeout: Duration::from_secs(parse_env_or("AJOB_GIT_TIMEOUT_SECS", 300)?),
            indexer_timeout: Duration::from_secs(parse_env_or("AJOB_INDEXER_TIMEOUT_SECS", 300)?),
        })
    }
}

fn required_path(var: &'static str) -> Result<PathBuf, ConfigError> {
    std::env::var(var)
        .map(PathBuf::from)
        .map_err(|_| ConfigError::MissingPath(var))
}

fn optional_path(var: &str) -> Option<PathBuf> {
    std::env::var(var).ok().map(PathBuf::from)
}

fn parse_env_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidInt(var, raw)),
        Err(_) => Ok(default),
    }
}

fn load_impersonation_mode() -> Result<ImpersonationMode, ConfigError> {
    match std::env::var("AJOB_IMPERSONATION_MODE").as_deref() {
        Ok("superuser-switch") | Err(_) => Ok(ImpersonationMode::SuperuserSwitch),
        Ok("elevation-rule") => {
            let command = std::env::var("AJOB_ELEVATION_COMMAND")
                .map_err(|_| ConfigError::MissingElevationCommand)?;
            Ok(ImpersonationMode::ElevationRule { command })
        }
        Ok(other) => Err(ConfigError::InvalidImpersonationMode(other.to_string())),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
