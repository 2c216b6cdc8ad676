// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ajob_core::repository::RepositoryName;
use ajob_core::FakeClock;
use tempfile::tempdir;

use super::*;

#[tokio::test]
async fn registering_a_local_path_is_immediately_ready() {
    let root = tempdir().unwrap();
    let local = tempdir().unwrap();
    let registry = RepositoryRegistry::new(root.path().to_path_buf(), FakeClock::default());

    let record = registry
        .register(
            RepositoryName::parse("demo").unwrap(),
            None,
            Some(local.path().to_path_buf()),
        )
        .await
        .unwrap();

    assert!(record.is_ready());
    assert!(registry.is_ready("demo"));
    assert_eq!(registry.ready_path("demo").unwrap(), local.path());
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let root = tempdir().unwrap();
    let local = tempdir().unwrap();
    let registry = RepositoryRegistry::new(root.path().to_path_buf(), FakeClock::default());

    registry
        .register(
            RepositoryName::parse("demo").unwrap(),
            None,
            Some(local.path().to_path_buf()),
        )
        .await
        .unwrap();

    let err = registry
        .register(RepositoryName::parse("demo").unwrap(), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRegistered(_)));
}

#[tokio::test]
async fn ready_path_rejects_unknown_repository() {
    let root = tempdir().unwrap();
    let registry = RepositoryRegistry::new(root.path().to_path_buf(), FakeClock::default());
    let err = registry.ready_path("nope").unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
}

#[tokio::test]
async fn unregister_deletes_the_tree_and_the_record() {
    let root = tempdir().unwrap();
    let local = tempdir().unwrap();
    let registry = RepositoryRegistry::new(root.path().to_path_buf(), FakeClock::default());
    registry
        .register(
            RepositoryName::parse("demo").unwrap(),
            None,
            Some(local.path().to_path_buf()),
        )
        .await
        .unwrap();

    registry.unregister("demo").await.unwrap();

    assert!(registry.get("demo").is_none());
    assert!(!local.path().exists());
}

#[tokio::test]
async fn a_failed_background_clone_leaves_no_partial_directory() {
    let root = tempdir().unwrap();
    let registry = RepositoryRegistry::new(root.path().to_path_buf(), FakeClock::default());

    let record = registry
        .register(
            RepositoryName::parse("demo").unwrap(),
            Some("/nonexistent/upstream/does-not-exist.git".to_string()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(record.status, CloneStatus::Cloning);

    let path = root.path().join("demo");
    let staging_path = root.path().join(".staging").join("demo");
    for _ in 0..200 {
        if registry.get("demo").unwrap().status != CloneStatus::Cloning {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }

    assert_eq!(registry.get("demo").unwrap().status, CloneStatus::Failed);
    assert!(!path.exists());
    assert!(!staging_path.exists());
}

#[tokio::test]
async fn list_reports_every_registration() {
    let root = tempdir().unwrap();
    let local_a = tempdir().unwrap();
    let local_b = tempdir().unwrap();
    let registry = RepositoryRegistry::new(root.path().to_path_buf(), FakeClock::default());
    registry
        .register(RepositoryName::parse("a").unwrap(), None, Some(local_a.path().to_path_buf()))
        .await
        .unwrap();
    registry
        .register(RepositoryName::parse("b").unwrap(), None, Some(local_b.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(registry.list().len(), 2);
}
