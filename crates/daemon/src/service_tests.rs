// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use ajob_adapters::{FakeCowCloner, FakeImpersonator};
use ajob_core::clock::FakeClock;
use ajob_core::id::SequentialIdGen;
use ajob_core::job::{JobOptions, JobState};
use ajob_core::owner::Username;
use ajob_core::repository::RepositoryName;
use ajob_engine::cancel::CancelRegistry;
use ajob_engine::executor::{ExecutorConfig, JobExecutor};
use ajob_engine::janitor::{Janitor, JanitorConfig};
use ajob_engine::queue::Queue;
use ajob_engine::registry::RepositoryRegistry;
use ajob_engine::scheduler::{Scheduler, SchedulerConfig};
use ajob_engine::workspace::WorkspaceManager;
use ajob_store::JobStore;

use super::*;

type TestService = Service<FakeImpersonator, FakeCowCloner, FakeClock, SequentialIdGen>;

fn harness(tmp: &std::path::Path) -> TestService {
    let clock = FakeClock::new(std::time::SystemTime::now());
    let store = Arc::new(JobStore::new(1024 * 1024));
    let registry = Arc::new(RepositoryRegistry::new(tmp.join("registry"), clock.clone()));
    let workspaces = Arc::new(WorkspaceManager::new(
        FakeCowCloner::default(),
        tmp.join("workspaces"),
    ));
    let queue = Arc::new(Queue::new());
    let cancels = Arc::new(CancelRegistry::new());

    let executor = Arc::new(JobExecutor::new(
        FakeImpersonator::new(),
        workspaces.clone(),
        registry.clone(),
        store.clone(),
        cancels.clone(),
        clock.clone(),
        ExecutorConfig {
            agent_program: "agent".to_string(),
            indexer_program: "indexer".to_string(),
            embedding_provider: "local".to_string(),
            git_timeout: Duration::from_secs(60),
            indexer_timeout: Duration::from_secs(60),
            terminal_retention: Duration::ZERO,
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
            max_concurrent_jobs: 2,
        },
    ));

    let janitor = Arc::new(Janitor::new(
        store.clone(),
        queue,
        cancels,
        workspaces.clone(),
        clock.clone(),
        JanitorConfig {
            interval: Duration::from_secs(60),
            queue_wait_timeout: Duration::from_secs(3600),
            terminal_retention: Duration::ZERO,
            graceful_shutdown_timeout: Duration::from_secs(30),
        },
    ));

    Service::new(
        store,
        registry,
        workspaces,
        scheduler,
        janitor,
        clock,
        SequentialIdGen::new("job"),
        4096,
    )
}

#[test]
fn create_job_starts_in_created_state() {
    let tmp = tempfile::tempdir().unwrap();
    let service = harness(tmp.path());

    let job_id = service
        .create_job(
            Username::new("alice"),
            "do the thing".to_string(),
            "repo-a".to_string(),
            JobOptions::default(),
        )
        .unwrap();

    let job = service.get_job(&job_id).unwrap();
    assert_eq!(job.state, JobState::Created);
    assert_eq!(job.owner, Username::new("alice"));
}

#[test]
fn create_job_rejects_an_empty_prompt() {
    let tmp = tempfile::tempdir().unwrap();
    let service = harness(tmp.path());

    let result = service.create_job(
        Username::new("alice"),
        String::new(),
        "repo-a".to_string(),
        JobOptions::default(),
    );

    assert!(matches!(
        result,
        Err(ServiceError::Validation(ajob_core::ValidationError::EmptyPrompt))
    ));
}

#[test]
fn create_job_rejects_a_too_long_prompt() {
    let tmp = tempfile::tempdir().unwrap();
    let service = harness(tmp.path());

    let result = service.create_job(
        Username::new("alice"),
        "x".repeat(5000),
        "repo-a".to_string(),
        JobOptions::default(),
    );

    assert!(matches!(
        result,
        Err(ServiceError::Validation(ajob_core::ValidationError::PromptTooLong { max: 4096 }))
    ));
}

#[test]
fn get_job_on_an_unknown_id_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let service = harness(tmp.path());

    let result = service.get_job(&ajob_core::JobId::new("does-not-exist"));

    assert!(matches!(result, Err(ServiceError::JobNotFound(_))));
}

#[test]
fn stage_file_attaches_to_a_created_job() {
    let tmp = tempfile::tempdir().unwrap();
    let service = harness(tmp.path());

    let job_id = service
        .create_job(
            Username::new("alice"),
            "do the thing".to_string(),
            "repo-a".to_string(),
            JobOptions::default(),
        )
        .unwrap();

    service
        .stage_file(&job_id, "notes.txt".to_string(), b"hello".to_vec())
        .unwrap();
}

#[test]
fn start_job_admits_it_to_the_queue() {
    let tmp = tempfile::tempdir().unwrap();
    let service = harness(tmp.path());

    let job_id = service
        .create_job(
            Username::new("alice"),
            "do the thing".to_string(),
            "repo-a".to_string(),
            JobOptions::default(),
        )
        .unwrap();

    let position = service.start_job(&job_id).unwrap();
    assert_eq!(position, 1);
    let job = service.get_job(&job_id).unwrap();
    assert_eq!(job.state, JobState::Queued);
    assert_eq!(job.queue_position, Some(1));
}

#[test]
fn cancel_job_on_a_queued_job_marks_it_cancelled() {
    let tmp = tempfile::tempdir().unwrap();
    let service = harness(tmp.path());

    let job_id = service
        .create_job(
            Username::new("alice"),
            "do the thing".to_string(),
            "repo-a".to_string(),
            JobOptions::default(),
        )
        .unwrap();
    service.start_job(&job_id).unwrap();

    let cancelled = service.cancel_job(&job_id).unwrap();

    assert!(cancelled);
    let job = service.get_job(&job_id).unwrap();
    assert_eq!(job.state, JobState::Cancelled);
    assert!(job.queue_position.is_none());
    assert!(job.captured_output.contains("[terminal reason: cancelled]"));
}

#[test]
fn list_jobs_for_owner_only_returns_that_owners_jobs() {
    let tmp = tempfile::tempdir().unwrap();
    let service = harness(tmp.path());

    service
        .create_job(
            Username::new("alice"),
            "alice's job".to_string(),
            "repo-a".to_string(),
            JobOptions::default(),
        )
        .unwrap();
    service
        .create_job(
            Username::new("bob"),
            "bob's job".to_string(),
            "repo-a".to_string(),
            JobOptions::default(),
        )
        .unwrap();

    let alice_jobs = service.list_jobs_for_owner(&Username::new("alice"));
    assert_eq!(alice_jobs.len(), 1);
    assert_eq!(alice_jobs[0].prompt, "alice's job");
}

#[tokio::test]
async fn register_and_list_and_unregister_repository_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    let service = harness(tmp.path());
    let local = tmp.path().join("local-checkout");
    std::fs::create_dir_all(&local).unwrap();

    service
        .register_repository(RepositoryName::parse("repo-a").unwrap(), None, Some(local))
        .await
        .unwrap();

    assert_eq!(service.list_repositories().len(), 1);

    service.unregister_repository("repo-a").await.unwrap();
    assert_eq!(service.list_repositories().len(), 0);
}

#[tokio::test]
async fn delete_job_tears_down_its_workspace_and_removes_it_from_the_store() {
    let tmp = tempfile::tempdir().unwrap();
    let service = harness(tmp.path());

    let job_id = service
        .create_job(
            Username::new("alice"),
            "do the thing".to_string(),
            "repo-a".to_string(),
            JobOptions::default(),
        )
        .unwrap();

    service.delete_job(&job_id).await.unwrap();

    assert!(matches!(
        service.get_job(&job_id),
        Err(ServiceError::JobNotFound(_))
    ));
}
