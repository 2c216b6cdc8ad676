// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ajob_adapters::FakeCowCloner;
use ajob_core::job::JobId;
use tempfile::tempdir;

use super::*;

fn manager(root: &std::path::Path) -> WorkspaceManager<FakeCowCloner> {
    WorkspaceManager::new(FakeCowCloner::default(), root.to_path_buf())
}

#[tokio::test]
async fn create_clones_and_prepares_files_dir() {
    let workspace_root = tempdir().unwrap();
    let source = tempdir().unwrap();
    let mgr = manager(workspace_root.path());
    let job_id = JobId::new("job-1");

    let path = mgr.create(&job_id, source.path()).await.unwrap();
    assert_eq!(path, workspace_root.path().join("job-1"));
}

#[tokio::test]
async fn staged_files_before_create_are_flushed_after_clone() {
    let workspace_root = tempdir().unwrap();
    let source = tempdir().unwrap();
    let mgr = manager(workspace_root.path());
    let job_id = JobId::new("job-1");

    mgr.stage_file(
        &job_id,
        StagedFile {
            filename: "notes.txt".to_string(),
            content: b"hello".to_vec(),
        },
    )
    .unwrap();

    let path = mgr.create(&job_id, source.path()).await.unwrap();
    let written = tokio::fs::read(path.join("files/notes.txt")).await.unwrap();
    assert_eq!(written, b"hello");
}

#[tokio::test]
async fn stage_file_rejects_illegal_filenames() {
    let workspace_root = tempdir().unwrap();
    let mgr = manager(workspace_root.path());
    let job_id = JobId::new("job-1");

    let err = mgr
        .stage_file(
            &job_id,
            StagedFile {
                filename: "../escape.txt".to_string(),
                content: Vec::new(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::IllegalFilename(_)));
}

#[tokio::test]
async fn destroy_removes_the_workspace_directory() {
    let workspace_root = tempdir().unwrap();
    let source = tempdir().unwrap();
    let mgr = manager(workspace_root.path());
    let job_id = JobId::new("job-1");

    let path = mgr.create(&job_id, source.path()).await.unwrap();
    tokio::fs::write(path.join("marker"), b"x").await.unwrap();

    mgr.destroy(&job_id).await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn destroy_is_a_no_op_when_never_created() {
    let workspace_root = tempdir().unwrap();
    let mgr = manager(workspace_root.path());
    mgr.destroy(&JobId::new("never-created")).await.unwrap();
}

#[tokio::test]
async fn list_files_reports_the_staged_files_directory() {
    let workspace_root = tempdir().unwrap();
    let source = tempdir().unwrap();
    let mgr = manager(workspace_root.path());
    let job_id = JobId::new("job-1");

    mgr.create(&job_id, source.path()).await.unwrap();

    let entries = mgr.list_files(&job_id, "").await.unwrap();
    assert!(entries.iter().any(|e| e.name == "files" && e.kind == FileEntryKind::Directory));
}

#[tokio::test]
async fn read_file_returns_a_staged_files_contents() {
    let workspace_root = tempdir().unwrap();
    let source = tempdir().unwrap();
    let mgr = manager(workspace_root.path());
    let job_id = JobId::new("job-1");

    mgr.stage_file(
        &job_id,
        StagedFile {
            filename: "notes.txt".to_string(),
            content: b"hello".to_vec(),
        },
    )
    .unwrap();
    mgr.create(&job_id, source.path()).await.unwrap();

    let content = mgr.read_file(&job_id, "files/notes.txt").await.unwrap();
    assert_eq!(content, b"hello");
}

#[tokio::test]
async fn read_file_refuses_a_symlink_that_escapes_the_workspace() {
    let workspace_root = tempdir().unwrap();
    let source = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let mgr = manager(workspace_root.path());
    let job_id = JobId::new("job-1");

    let path = mgr.create(&job_id, source.path()).await.unwrap();
    tokio::fs::write(outside.path().join("secret.txt"), b"secret")
        .await
        .unwrap();
    #[cfg(unix)]
    std::os::unix::fs::symlink(outside.path().join("secret.txt"), path.join("files/escape.txt"))
        .unwrap();

    let err = mgr.read_file(&job_id, "files/escape.txt").await.unwrap_err();
    assert!(matches!(err, WorkspaceError::PathEscapesWorkspace(_)));
}

#[tokio::test]
async fn list_files_refuses_a_subpath_that_escapes_the_workspace() {
    let workspace_root = tempdir().unwrap();
    let source = tempdir().unwrap();
    let mgr = manager(workspace_root.path());
    let job_id = JobId::new("job-1");

    mgr.create(&job_id, source.path()).await.unwrap();

    let err = mgr
        .list_files(&job_id, "../../etc")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkspaceError::PathEscapesWorkspace(_) | WorkspaceError::Io(_)
    ));
}
