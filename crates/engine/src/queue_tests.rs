// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use super::*;

#[test]
fn submit_then_position_is_one_based() {
    let queue = Queue::new();
    queue.submit(JobId::new("a"));
    queue.submit(JobId::new("b"));
    assert_eq!(queue.position_of(&JobId::new("a")), Some(1));
    assert_eq!(queue.position_of(&JobId::new("b")), Some(2));
}

#[test]
fn duplicate_submit_is_rejected() {
    let queue = Queue::new();
    assert!(queue.submit(JobId::new("a")));
    assert!(!queue.submit(JobId::new("a")));
    assert_eq!(queue.len(), 1);
}

#[test]
fn cancel_removes_a_queued_job() {
    let queue = Queue::new();
    queue.submit(JobId::new("a"));
    assert!(queue.cancel(&JobId::new("a")));
    assert!(queue.is_empty());
}

#[test]
fn cancel_on_absent_job_is_idempotent_false() {
    let queue = Queue::new();
    assert!(!queue.cancel(&JobId::new("ghost")));
}

#[tokio::test]
async fn take_pops_in_fifo_order() {
    let queue = Queue::new();
    queue.submit(JobId::new("a"));
    queue.submit(JobId::new("b"));

    assert_eq!(queue.take().await, JobId::new("a"));
    assert_eq!(queue.take().await, JobId::new("b"));
}

#[tokio::test]
async fn take_waits_for_a_submit() {
    let queue = Arc::new(Queue::new());
    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.take().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.submit(JobId::new("late"));

    let taken = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(taken, JobId::new("late"));
}
