// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace Manager: owns the per-job directory tree, file staging,
//! read-only browsing, and scoped deletion.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use ajob_adapters::CowCloner;
use ajob_core::error::validate_filename;
use ajob_core::job::{JobId, StagedFile};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::WorkspaceError;

const FILES_DIR: &str = "files";

/// One entry returned by [`WorkspaceManager::list_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub kind: FileEntryKind,
    pub size: u64,
    pub mtime: SystemTime,
}

/// What `list_files` found at a given entry. Symlinks are reported as
/// their own kind rather than resolved, since resolving them is exactly
/// what the escape guard in `read_file`/`list_files` exists to control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEntryKind {
    File,
    Directory,
    Symlink,
}

/// Creates and tears down `<workspace_root>/<job-id>/` trees and the
/// `files/` subdirectory staged inputs land in.
///
/// Files staged before the workspace exists (the job is still `created`)
/// are buffered in memory and flushed into `files/` right after the clone
/// step succeeds — see DESIGN.md's Open Question decision. There is no
/// on-disk pending directory; restart-persistence is an explicit non-goal.
pub struct WorkspaceManager<C: CowCloner> {
    cloner: C,
    workspace_root: PathBuf,
    pending_files: DashMap<JobId, Vec<StagedFile>>,
    locks: DashMap<JobId, Arc<Mutex<()>>>,
}

impl<C: CowCloner> WorkspaceManager<C> {
    pub fn new(cloner: C, workspace_root: PathBuf) -> Self {
        Self {
            cloner,
            workspace_root,
            pending_files: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    pub fn path_for(&self, job_id: &JobId) -> PathBuf {
        self.workspace_root.join(job_id.as_str())
    }

    /// Buffers a staged file for `job_id`, to be flushed into `files/` once
    /// the workspace exists. Valid any time before `destroy`.
    pub fn stage_file(&self, job_id: &JobId, file: StagedFile) -> Result<(), WorkspaceError> {
        validate_filename(&file.filename)
            .map_err(|e| WorkspaceError::IllegalFilename(e.to_string()))?;
        self.pending_files.entry(job_id.clone()).or_default().push(file);
        Ok(())
    }

    /// Clones `source_dir` into this job's workspace, then flushes any
    /// files staged before the clone completed.
    pub async fn create(&self, job_id: &JobId, source_dir: &std::path::Path) -> Result<PathBuf, WorkspaceError> {
        let dest = self.path_for(job_id);
        let lock = self.job_lock(job_id);
        let _guard = lock.lock().await;

        self.cloner.clone_tree(source_dir, &dest).await?;

        let files_dir = dest.join(FILES_DIR);
        tokio::fs::create_dir_all(&files_dir)
            .await
            .map_err(|e| WorkspaceError::Io(e.to_string()))?;

        if let Some((_, staged)) = self.pending_files.remove(job_id) {
            for file in staged {
                let path = files_dir.join(&file.filename);
                tokio::fs::write(&path, &file.content)
                    .await
                    .map_err(|e| WorkspaceError::Io(e.to_string()))?;
            }
        }

        Ok(dest)
    }

    /// Read-only directory listing within the job's workspace. `subpath`
    /// is relative to the workspace root and may name a subdirectory;
    /// empty lists the root. Every path is canonicalised and checked
    /// against the workspace root before the listing is returned, so a
    /// symlink planted inside the workspace (e.g. via a staged file)
    /// cannot be used to enumerate a directory outside it.
    pub async fn list_files(
        &self,
        job_id: &JobId,
        subpath: &str,
    ) -> Result<Vec<FileEntry>, WorkspaceError> {
        let dir = self.resolve_within_workspace(job_id, subpath).await?;

        let mut read_dir = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| WorkspaceError::Io(e.to_string()))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| WorkspaceError::Io(e.to_string()))?
        {
            let symlink_metadata = tokio::fs::symlink_metadata(entry.path())
                .await
                .map_err(|e| WorkspaceError::Io(e.to_string()))?;
            let kind = if symlink_metadata.is_symlink() {
                FileEntryKind::Symlink
            } else if symlink_metadata.is_dir() {
                FileEntryKind::Directory
            } else {
                FileEntryKind::File
            };
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
                size: symlink_metadata.len(),
                mtime: symlink_metadata
                    .modified()
                    .map_err(|e| WorkspaceError::Io(e.to_string()))?,
            });
        }
        Ok(entries)
    }

    /// Reads one file from within the job's workspace, subject to the
    /// same escape guard as `list_files`.
    pub async fn read_file(
        &self,
        job_id: &JobId,
        subpath: &str,
    ) -> Result<Vec<u8>, WorkspaceError> {
        let path = self.resolve_within_workspace(job_id, subpath).await?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| WorkspaceError::Io(e.to_string()))
    }

    /// Canonicalises `subpath` against `job_id`'s workspace root and
    /// rejects the result unless it still lives under that root. This is
    /// what keeps symbolic links discovered while resolving `subpath`
    /// (or already present in the workspace tree) from being followed
    /// outside it — canonicalisation resolves every symlink component
    /// before the prefix check runs.
    async fn resolve_within_workspace(
        &self,
        job_id: &JobId,
        subpath: &str,
    ) -> Result<PathBuf, WorkspaceError> {
        let root = self.path_for(job_id);
        let canonical_root = tokio::fs::canonicalize(&root)
            .await
            .map_err(|_| WorkspaceError::NotFound(job_id.clone()))?;

        let candidate = if subpath.is_empty() {
            root
        } else {
            root.join(subpath)
        };
        let canonical = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|e| WorkspaceError::Io(e.to_string()))?;

        if !canonical.starts_with(&canonical_root) {
            return Err(WorkspaceError::PathEscapesWorkspace(subpath.to_string()));
        }
        Ok(canonical)
    }

    /// Deletes the job's workspace tree. A no-op if it was never created
    /// (e.g. the job failed before dispatch), so callers can call this
    /// unconditionally on every terminal transition.
    pub async fn destroy(&self, job_id: &JobId) -> Result<(), WorkspaceError> {
        let lock = self.job_lock(job_id);
        let _guard = lock.lock().await;
        self.pending_files.remove(job_id);

        let path = self.path_for(job_id);
        if path.exists() {
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| WorkspaceError::Io(e.to_string()))?;
        }
        self.locks.remove(job_id);
        Ok(())
    }

    fn job_lock(&self, job_id: &JobId) -> Arc<Mutex<()>> {
        self.locks
            .entry(job_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
