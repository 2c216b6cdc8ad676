// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ajob_core::job::JobId;

#[test]
fn unregistered_job_is_not_registered_and_request_is_a_no_op() {
    let registry = CancelRegistry::new();
    let id = JobId::new("a");
    assert!(!registry.is_registered(&id));
    registry.request(&id, TerminalReason::Cancelled);
    assert_eq!(registry.taken_reason(&id), None);
}

#[test]
fn register_then_deregister_clears_the_entry() {
    let registry = CancelRegistry::new();
    let id = JobId::new("a");
    registry.register(&id);
    assert!(registry.is_registered(&id));
    registry.deregister(&id);
    assert!(!registry.is_registered(&id));
}

#[tokio::test]
async fn request_wakes_the_registered_notify_and_records_the_reason() {
    let registry = CancelRegistry::new();
    let id = JobId::new("a");
    let notify = registry.register(&id);

    registry.request(&id, TerminalReason::Timeout);

    notify.notified().await;
    assert_eq!(registry.taken_reason(&id), Some(TerminalReason::Timeout));
}

#[test]
fn a_later_request_overwrites_the_recorded_reason() {
    let registry = CancelRegistry::new();
    let id = JobId::new("a");
    registry.register(&id);

    registry.request(&id, TerminalReason::Queue);
    registry.request(&id, TerminalReason::Cancelled);

    assert_eq!(registry.taken_reason(&id), Some(TerminalReason::Cancelled));
}

#[test]
fn distinct_jobs_have_independent_signals() {
    let registry = CancelRegistry::new();
    let a = JobId::new("a");
    let b = JobId::new("b");
    registry.register(&a);
    registry.register(&b);

    registry.request(&a, TerminalReason::Cancelled);

    assert_eq!(registry.taken_reason(&a), Some(TerminalReason::Cancelled));
    assert_eq!(registry.taken_reason(&b), None);
}
