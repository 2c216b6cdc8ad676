// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::UNIX_EPOCH;
use yare::parameterized;

#[parameterized(
    alnum = { "demo1" },
    with_dash = { "demo-repo" },
    with_underscore = { "demo_repo" },
)]
fn accepts_valid_names(raw: &str) {
    assert!(RepositoryName::parse(raw).is_ok());
}

#[parameterized(
    empty = { "" },
    slash = { "demo/repo" },
    space = { "demo repo" },
    dotdot = { "../escape" },
)]
fn rejects_invalid_names(raw: &str) {
    assert!(RepositoryName::parse(raw).is_err());
}

#[test]
fn new_registration_with_upstream_starts_cloning() {
    let name = RepositoryName::parse("demo").unwrap();
    let repo = RegisteredRepository::new(
        name,
        "/registry/demo".into(),
        Some("git@example:demo".to_string()),
        UNIX_EPOCH,
    );
    assert_eq!(repo.status, CloneStatus::Cloning);
    assert!(!repo.is_ready());
}

#[test]
fn new_registration_without_upstream_is_immediately_ready() {
    let name = RepositoryName::parse("local-only").unwrap();
    let repo = RegisteredRepository::new(name, "/registry/local-only".into(), None, UNIX_EPOCH);
    assert_eq!(repo.status, CloneStatus::Ready);
    assert!(repo.is_ready());
}
