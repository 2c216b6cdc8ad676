// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, Notify};

use crate::subprocess::CANCEL_GRACE_PERIOD;

use super::host_user::HostUserLookup;
use super::{ImpersonatorError, ProcessHandle, RunOutcome, RunRequest};

/// Which mechanism the daemon uses to drop privilege to the target user.
#[derive(Debug, Clone)]
pub enum ImpersonationMode {
    /// The daemon runs as a superuser and sets the child's uid/gid directly.
    SuperuserSwitch,
    /// The daemon runs as an unprivileged user and shells out to a
    /// configured elevation command (e.g. `sudo -n -u <user> --`) to switch.
    ElevationRule { command: String },
}

/// Runs processes under a target host user's identity.
#[derive(Clone)]
pub struct RealImpersonator {
    mode: Arc<ImpersonationMode>,
    users: Arc<dyn HostUserLookup>,
}

impl RealImpersonator {
    pub fn new(mode: ImpersonationMode, users: Arc<dyn HostUserLookup>) -> Self {
        Self {
            mode: Arc::new(mode),
            users,
        }
    }

    fn build_command(
        &self,
        request: &RunRequest,
    ) -> Result<tokio::process::Command, ImpersonatorError> {
        let mut cmd = match self.mode.as_ref() {
            ImpersonationMode::SuperuserSwitch => {
                let host_user = self.users.lookup(&request.target_user)?;
                let mut cmd = tokio::process::Command::new(&request.program);
                cmd.args(&request.args);
                cmd.uid(host_user.uid);
                cmd.gid(host_user.gid);
                cmd.env("HOME", &host_user.home);
                cmd.env("USER", &request.target_user);
                cmd.env("LOGNAME", &request.target_user);
                cmd
            }
            ImpersonationMode::ElevationRule { command } => {
                let mut cmd = tokio::process::Command::new(command);
                cmd.arg("-n").arg("-u").arg(&request.target_user).arg("--");
                cmd.arg(&request.program);
                cmd.args(&request.args);
                cmd
            }
        };

        cmd.current_dir(&request.working_dir);
        for (key, value) in &request.env_overrides {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        Ok(cmd)
    }
}

#[async_trait]
impl super::Impersonator for RealImpersonator {
    async fn run(&self, request: RunRequest) -> Result<ProcessHandle, ImpersonatorError> {
        let mut cmd = self.build_command(&request)?;

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ImpersonatorError::ExecutableNotFound(request.program.clone())
            }
            std::io::ErrorKind::PermissionDenied => {
                ImpersonatorError::PermissionDenied(request.target_user.clone())
            }
            _ => ImpersonatorError::SpawnFailed(e.to_string()),
        })?;

        if !request.stdin_bytes.is_empty() {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(&request.stdin_bytes).await;
            }
        } else {
            child.stdin.take();
        }

        let (output_tx, output_rx) = mpsc::channel(64);

        if let Some(mut stdout) = child.stdout.take() {
            let tx = output_tx.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match stdout.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
        if let Some(mut stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match stderr.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if output_tx.send(buf[..n].to_vec()).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }

        let cancel = Arc::new(Notify::new());
        let cancel_for_wait = cancel.clone();
        let timeout = request.timeout;

        let wait_task = tokio::spawn(async move {
            let pid = child.id().map(|p| p as i32);

            tokio::select! {
                result = child.wait() => {
                    match result {
                        Ok(status) => RunOutcome::Exited(status.code().unwrap_or(-1)),
                        Err(_) => RunOutcome::Exited(-1),
                    }
                }
                _ = tokio::time::sleep(timeout) => {
                    terminate_then_kill(pid, &mut child).await;
                    RunOutcome::TimedOut
                }
                _ = cancel_for_wait.notified() => {
                    terminate_then_kill(pid, &mut child).await;
                    RunOutcome::Cancelled
                }
            }
        });

        Ok(ProcessHandle::new(output_rx, cancel, wait_task))
    }
}

async fn terminate_then_kill(pid: Option<i32>, child: &mut tokio::process::Child) {
    if let Some(pid) = pid {
        let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
    }
    tokio::select! {
        _ = child.wait() => {}
        _ = tokio::time::sleep(CANCEL_GRACE_PERIOD) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

#[cfg(test)]
#[path = "real_tests.rs"]
mod tests;
