// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::impersonator::host_user::RealHostUserLookup;
use crate::impersonator::Impersonator as _;

fn current_username() -> String {
    let uid = nix::unistd::getuid();
    nix::unistd::User::from_uid(uid)
        .expect("passwd lookup must succeed for the running process")
        .expect("current uid must resolve to a passwd entry")
        .name
}

fn impersonator_as_self() -> RealImpersonator {
    RealImpersonator::new(ImpersonationMode::SuperuserSwitch, Arc::new(RealHostUserLookup))
}

fn request(program: &str, args: &[&str], timeout: Duration) -> RunRequest {
    RunRequest {
        target_user: current_username(),
        working_dir: std::env::temp_dir(),
        program: program.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
        stdin_bytes: Vec::new(),
        env_overrides: Vec::new(),
        timeout,
    }
}

#[tokio::test]
async fn captures_stdout_and_exits_cleanly() {
    let impersonator = impersonator_as_self();
    let mut handle = impersonator
        .run(request("printf", &["hello"], Duration::from_secs(5)))
        .await
        .unwrap();

    let mut collected = Vec::new();
    while let Some(chunk) = handle.output.recv().await {
        collected.extend(chunk);
    }
    assert_eq!(collected, b"hello");

    assert_eq!(handle.wait().await, RunOutcome::Exited(0));
}

#[tokio::test]
async fn nonzero_exit_is_reported() {
    let impersonator = impersonator_as_self();
    let handle = impersonator
        .run(request("sh", &["-c", "exit 7"], Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(handle.wait().await, RunOutcome::Exited(7));
}

#[tokio::test]
async fn timeout_terminates_the_process() {
    let impersonator = impersonator_as_self();
    let handle = impersonator
        .run(request("sleep", &["5"], Duration::from_millis(100)))
        .await
        .unwrap();
    assert_eq!(handle.wait().await, RunOutcome::TimedOut);
}

#[tokio::test]
async fn cancel_terminates_the_process() {
    let impersonator = impersonator_as_self();
    let handle = impersonator
        .run(request("sleep", &["5"], Duration::from_secs(30)))
        .await
        .unwrap();
    handle.cancel();
    assert_eq!(handle.wait().await, RunOutcome::Cancelled);
}

#[tokio::test]
async fn unknown_program_is_reported_as_not_found() {
    let impersonator = impersonator_as_self();
    let err = impersonator
        .run(request(
            "definitely-not-a-real-executable",
            &[],
            Duration::from_secs(5),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ImpersonatorError::ExecutableNotFound(_)));
}
