// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{CloneMethod, CloneProbe, ClonerError, CowCloner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Probes a destination root by attempting a throwaway reflink copy and
/// falling back to filesystem-type heuristics. The result is cached by the
/// caller (the daemon probes once at startup; see `RealCowCloner::new`).
#[derive(Clone, Default)]
pub struct RealCloneProbe;

impl CloneProbe for RealCloneProbe {
    fn probe(&self, root: &Path) -> CloneMethod {
        let probe_src = root.join(".ajob-probe-src");
        let probe_dst = root.join(".ajob-probe-dst");
        let _ = std::fs::remove_file(&probe_src);
        let _ = std::fs::remove_file(&probe_dst);

        if std::fs::write(&probe_src, b"probe").is_ok() {
            let reflink_ok = reflink_copy::reflink(&probe_src, &probe_dst).is_ok();
            let _ = std::fs::remove_file(&probe_src);
            let _ = std::fs::remove_file(&probe_dst);
            if reflink_ok {
                return CloneMethod::Reflink;
            }
        }

        if is_subvolume_capable(root) {
            return CloneMethod::SubvolumeSnapshot;
        }

        CloneMethod::Hardlink
    }
}

fn is_subvolume_capable(root: &Path) -> bool {
    std::process::Command::new("btrfs")
        .args(["subvolume", "show"])
        .arg(root)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Production `CowCloner`: probes once, caches the chosen method, and falls
/// back down the preference chain within a single clone if the cached
/// method turns out not to apply to this particular source/dest pair
/// (e.g. the repository root isn't a subvolume even though the filesystem
/// is btrfs).
#[derive(Clone)]
pub struct RealCowCloner {
    method: CloneMethod,
}

impl RealCowCloner {
    /// Probes `workspace_root` once and caches the result for the process
    /// lifetime, per the "probe once at startup" design note.
    pub fn new(probe: &dyn CloneProbe, workspace_root: &Path) -> Self {
        Self {
            method: probe.probe(workspace_root),
        }
    }

    pub fn method(&self) -> CloneMethod {
        self.method
    }
}

#[async_trait]
impl CowCloner for RealCowCloner {
    async fn clone_tree(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
    ) -> Result<CloneMethod, ClonerError> {
        if !source_dir.exists() {
            return Err(ClonerError::SourceMissing(source_dir.to_path_buf()));
        }
        if dest_dir.exists() {
            return Err(ClonerError::DestinationExists(dest_dir.to_path_buf()));
        }

        let source = source_dir.to_path_buf();
        let dest = dest_dir.to_path_buf();
        let method = self.method;

        match method {
            CloneMethod::Reflink => {
                tokio::task::spawn_blocking(move || reflink_tree(&source, &dest))
                    .await
                    .map_err(|e| ClonerError::Failed(e.to_string()))??;
                Ok(CloneMethod::Reflink)
            }
            CloneMethod::SubvolumeSnapshot => match snapshot_subvolume(&source, &dest).await {
                Ok(()) => Ok(CloneMethod::SubvolumeSnapshot),
                Err(_) => {
                    tokio::task::spawn_blocking(move || copy_tree(&source, &dest))
                        .await
                        .map_err(|e| ClonerError::Failed(e.to_string()))??;
                    Ok(CloneMethod::FullCopy)
                }
            },
            // The hardlink tier sacrifices CoW semantics, and since the agent
            // writes freely into the workspace, it must not share inodes with
            // the source: this tier performs a full recursive copy instead
            // (see spec's tier-3 note).
            CloneMethod::Hardlink | CloneMethod::FullCopy => {
                tokio::task::spawn_blocking(move || copy_tree(&source, &dest))
                    .await
                    .map_err(|e| ClonerError::Failed(e.to_string()))??;
                Ok(method)
            }
        }
    }
}

async fn snapshot_subvolume(source: &Path, dest: &Path) -> Result<(), ClonerError> {
    let mut cmd = Command::new("btrfs");
    cmd.args(["subvolume", "snapshot"]).arg(source).arg(dest);
    let output = crate::subprocess::run_with_timeout(
        cmd,
        crate::subprocess::SNAPSHOT_TIMEOUT,
        "btrfs subvolume snapshot",
    )
    .await
    .map_err(ClonerError::Failed)?;
    if !output.status.success() {
        return Err(ClonerError::Failed(format!(
            "btrfs subvolume snapshot exited with {}",
            output.status
        )));
    }
    Ok(())
}

fn reflink_tree(source: &Path, dest: &Path) -> Result<(), ClonerError> {
    walk_copy(source, dest, &mut |from, to| {
        reflink_copy::reflink_or_copy(from, to)
            .map(|_| ())
            .map_err(|e| ClonerError::Failed(e.to_string()))
    })
}

fn copy_tree(source: &Path, dest: &Path) -> Result<(), ClonerError> {
    walk_copy(source, dest, &mut |from, to| {
        std::fs::copy(from, to)
            .map(|_| ())
            .map_err(|e| ClonerError::Failed(e.to_string()))
    })
}

/// Recursively mirrors `source` into `dest`, calling `copy_file` for each
/// regular file. Symlinks are recreated as symlinks pointing at their
/// original (in-tree) target rather than followed, so a symlink that
/// escapes `source` lands as a dangling link inside the clone instead of
/// pulling in content from outside the source tree.
fn walk_copy(
    source: &Path,
    dest: &Path,
    copy_file: &mut dyn FnMut(&Path, &Path) -> Result<(), ClonerError>,
) -> Result<(), ClonerError> {
    std::fs::create_dir_all(dest).map_err(|e| ClonerError::Failed(e.to_string()))?;
    for entry in std::fs::read_dir(source).map_err(|e| ClonerError::Failed(e.to_string()))? {
        let entry = entry.map_err(|e| ClonerError::Failed(e.to_string()))?;
        let file_type = entry
            .file_type()
            .map_err(|e| ClonerError::Failed(e.to_string()))?;
        let from = entry.path();
        let to: PathBuf = dest.join(entry.file_name());

        if file_type.is_symlink() {
            let target = std::fs::read_link(&from).map_err(|e| ClonerError::Failed(e.to_string()))?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&target, &to)
                .map_err(|e| ClonerError::Failed(e.to_string()))?;
        } else if file_type.is_dir() {
            walk_copy(&from, &to, copy_file)?;
        } else {
            copy_file(&from, &to)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "real_tests.rs"]
mod tests;
