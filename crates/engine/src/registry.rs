// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository Registry: the set of registered source repositories and
//! their on-disk master clones.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ajob_core::repository::{CloneStatus, RegisteredRepository, RepositoryName};
use ajob_core::Clock;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::process::Command;

use crate::error::RegistryError;

const CLONE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Maintains registered repositories: read-mostly, with registration and
/// unregistration the only operations that need exclusive access to a
/// single entry at a time.
pub struct RepositoryRegistry<C: Clock> {
    repos: DashMap<String, Arc<Mutex<RegisteredRepository>>>,
    registry_root: PathBuf,
    clock: C,
}

impl<C: Clock> RepositoryRegistry<C> {
    pub fn new(registry_root: PathBuf, clock: C) -> Self {
        Self {
            repos: DashMap::new(),
            registry_root,
            clock,
        }
    }

    /// Registers `name`, cloning from `upstream` if given (asynchronously —
    /// this call returns once the clone subprocess has been launched and
    /// its outcome recorded, not before it starts). If `upstream` is `None`,
    /// `local_path` is adopted directly as the master clone and the
    /// repository is immediately `ready`.
    pub async fn register(
        &self,
        name: RepositoryName,
        upstream: Option<String>,
        local_path: Option<PathBuf>,
    ) -> Result<RegisteredRepository, RegistryError> {
        if self.repos.contains_key(name.as_str()) {
            return Err(RegistryError::AlreadyRegistered(name.as_str().to_string()));
        }

        let path = match &upstream {
            Some(_) => self.registry_root.join(name.as_str()),
            None => local_path.unwrap_or_else(|| self.registry_root.join(name.as_str())),
        };

        let record = RegisteredRepository::new(name.clone(), path.clone(), upstream.clone(), self.clock.now());
        self.repos
            .insert(name.as_str().to_string(), Arc::new(Mutex::new(record.clone())));

        if let Some(upstream_url) = upstream {
            self.clone_in_background(name, path, upstream_url);
        }

        Ok(record)
    }

    /// Clones into a staging path under `registry_root` and only renames it
    /// onto `path` once the clone has fully succeeded, so nothing ever
    /// observes a partially-written tree at `path` — on failure the staging
    /// directory is removed instead, leaving no partial clone on disk at
    /// either location.
    fn clone_in_background(&self, name: RepositoryName, path: PathBuf, upstream: String) {
        let entry = self
            .repos
            .get(name.as_str())
            .map(|e| e.value().clone())
            .expect("just inserted");

        let staging_path = self
            .registry_root
            .join(".staging")
            .join(name.as_str());

        tokio::spawn(async move {
            if let Some(parent) = staging_path.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    tracing::warn!(repo = name.as_str(), error = %e, "failed to create registry staging directory");
                    entry.lock().status = CloneStatus::Failed;
                    return;
                }
            }

            let mut cmd = Command::new("git");
            cmd.arg("clone").arg(&upstream).arg(&staging_path);
            let outcome = ajob_adapters::subprocess::run_with_timeout(
                cmd,
                CLONE_TIMEOUT,
                "registry clone",
            )
            .await;

            let succeeded = match &outcome {
                Ok(output) if output.status.success() => true,
                Ok(output) => {
                    tracing::warn!(
                        repo = name.as_str(),
                        stderr = %String::from_utf8_lossy(&output.stderr),
                        "registry clone exited non-zero"
                    );
                    false
                }
                Err(message) => {
                    tracing::warn!(repo = name.as_str(), error = %message, "registry clone failed");
                    false
                }
            };

            if succeeded {
                if let Err(e) = tokio::fs::rename(&staging_path, &path).await {
                    tracing::warn!(repo = name.as_str(), error = %e, "failed to rename registry clone into place");
                    let _ = tokio::fs::remove_dir_all(&staging_path).await;
                    entry.lock().status = CloneStatus::Failed;
                    return;
                }
                entry.lock().status = CloneStatus::Ready;
            } else {
                let _ = tokio::fs::remove_dir_all(&staging_path).await;
                entry.lock().status = CloneStatus::Failed;
            }
        });
    }

    pub fn get(&self, name: &str) -> Option<RegisteredRepository> {
        self.repos.get(name).map(|e| e.lock().clone())
    }

    pub fn list(&self) -> Vec<RegisteredRepository> {
        self.repos.iter().map(|e| e.value().lock().clone()).collect()
    }

    /// Returns the ready master clone's path, or an error describing why
    /// the repository cannot be used to start a job right now.
    pub fn ready_path(&self, name: &str) -> Result<PathBuf, RegistryError> {
        let repo = self
            .repos
            .get(name)
            .map(|e| e.lock().clone())
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if !repo.is_ready() {
            return Err(RegistryError::NotReady(repo.status.to_string()));
        }
        Ok(repo.path)
    }

    pub fn is_ready(&self, name: &str) -> bool {
        self.repos
            .get(name)
            .map(|e| e.lock().is_ready())
            .unwrap_or(false)
    }

    /// Deletes the on-disk tree and removes the registration. Jobs still
    /// referencing this repository fail at dispatch time with reason
    /// "repo-gone" (see `Scheduler::dispatch_one`), not here.
    pub async fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        let (_, repo) = self
            .repos
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let path = repo.lock().path.clone();
        if path.exists() {
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| RegistryError::CloneFailed(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
