// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ajobd — background process that owns the job queue and dispatches work
//! to the coding agent. Started by the (out-of-scope) HTTP layer's deploy
//! and should not be invoked directly.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use ajob_daemon::{build, logging::setup_logging, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ajobd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("ajobd {}", env!("CARGO_PKG_VERSION"));
                println!("Batch execution daemon for the coding agent.");
                println!();
                println!("USAGE:");
                println!("    ajobd");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: ajobd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    let log_guard = setup_logging(&config)?;

    info!("Starting ajobd");

    let service = build(&config);
    let scheduler = service.scheduler();
    let janitor = service.janitor();

    scheduler.spawn_dispatch_loop();
    janitor.clone().spawn();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    println!("READY");
    info!(
        max_concurrent_jobs = config.max_concurrent_jobs,
        "Daemon ready"
    );

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    janitor.shutdown().await;
    drop(log_guard);
    info!("Daemon stopped");

    Ok(())
}
