// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log setup, following the teacher's `setup_logging`: a non-blocking file
//! appender plus whatever `RUST_LOG` asks for, defaulting to `info`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("log path {0:?} has no parent directory")]
    NoLogDir(std::path::PathBuf),
    #[error("failed to create log directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Initializes the global tracing subscriber and returns the guard that
/// must be kept alive for the process lifetime to flush buffered writes.
pub fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LoggingError> {
    let parent = config
        .log_path
        .parent()
        .ok_or_else(|| LoggingError::NoLogDir(config.log_path.clone()))?;
    std::fs::create_dir_all(parent)?;

    let file_name = config
        .log_path
        .file_name()
        .ok_or_else(|| LoggingError::NoLogDir(config.log_path.clone()))?;
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
