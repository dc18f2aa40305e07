//! Per-target repository synchronization.

use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::changeset::ChangeSet;
use crate::config::{RelayConfig, RepositoryTarget};
use crate::error::SyncError;
use crate::repository::GitWorkspace;
use crate::sync::reconcile::{Reconciler, Reconciliation};
use crate::workspace::Workspace;

/// Terminal outcome of synchronizing one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Changes were committed and pushed.
    Updated,
    /// The target already matched the gateway; nothing committed.
    NoChanges,
    /// Synchronization failed.
    Failed(String),
}

/// Synchronizes one target repository against the gateway change set.
pub struct RepositorySynchronizer {
    config: Arc<RelayConfig>,
    reconciler: Reconciler,
}

impl RepositorySynchronizer {
    /// Creates a new synchronizer.
    pub fn new(config: Arc<RelayConfig>) -> Self {
        Self {
            config,
            reconciler: Reconciler::default(),
        }
    }

    /// Creates a synchronizer with a custom reconciler.
    pub fn with_reconciler(config: Arc<RelayConfig>, reconciler: Reconciler) -> Self {
        Self { config, reconciler }
    }

    /// Runs the full per-target flow: clone, branch resolve, reconcile each
    /// change-set path in order, then commit and push only when the working
    /// tree is dirty.
    ///
    /// The caller owns `workspace` preparation and cleanup.
    pub async fn sync(
        &self,
        target: &RepositoryTarget,
        change_set: &ChangeSet,
        gateway: &Workspace,
        workspace: &Workspace,
    ) -> Result<SyncOutcome, SyncError> {
        info!(repo = %target.name, "Cloning target repository");
        let repo = GitWorkspace::clone(
            &target.remote_url,
            workspace.path(),
            self.config.clone_timeout(),
        )
        .await
        .map_err(|e| repo_err(&target.name, e))?;

        self.resolve_branch(target, &repo).await?;
        self.reconcile_paths(target, change_set, gateway, &repo)
            .await?;

        let clean = repo
            .is_clean()
            .await
            .map_err(|e| repo_err(&target.name, e))?;
        if clean {
            info!(repo = %target.name, "No changes detected");
            return Ok(SyncOutcome::NoChanges);
        }

        let message = commit_message();
        repo.commit(&message)
            .await
            .map_err(|e| repo_err(&target.name, e))?;
        repo.push(self.config.target_branch(), self.config.push_timeout())
            .await
            .map_err(|e| repo_err(&target.name, e))?;

        info!(repo = %target.name, "Changes committed and pushed");
        Ok(SyncOutcome::Updated)
    }

    /// Checks out the configured branch, creating it on the remote when it
    /// does not exist yet.
    async fn resolve_branch(
        &self,
        target: &RepositoryTarget,
        repo: &GitWorkspace,
    ) -> Result<(), SyncError> {
        let branch = self.config.target_branch();

        let exists = repo
            .has_remote_branch(branch)
            .await
            .map_err(|e| repo_err(&target.name, e))?;

        if exists {
            debug!(repo = %target.name, branch = %branch, "Branch exists, switching to it");
            repo.checkout_branch(branch)
                .await
                .map_err(|e| repo_err(&target.name, e))?;
            repo.pull_ff(branch, self.config.clone_timeout())
                .await
                .map_err(|e| repo_err(&target.name, e))?;
        } else {
            repo.create_branch_and_push(branch, self.config.push_timeout())
                .await
                .map_err(|e| repo_err(&target.name, e))?;
        }

        Ok(())
    }

    /// Reconciles every change-set path, independently and in order, staging
    /// each copy or removal.
    async fn reconcile_paths(
        &self,
        target: &RepositoryTarget,
        change_set: &ChangeSet,
        gateway: &Workspace,
        repo: &GitWorkspace,
    ) -> Result<(), SyncError> {
        for path in change_set.paths() {
            let action = self
                .reconciler
                .reconcile(gateway.path(), repo.path(), path)?;

            match action {
                Reconciliation::Copied => {
                    repo.stage_path(path)
                        .await
                        .map_err(|e| SyncError::file(path, e.to_string()))?;
                }
                Reconciliation::Deleted => {
                    repo.stage_removal(path)
                        .await
                        .map_err(|e| SyncError::file(path, e.to_string()))?;
                }
                Reconciliation::Unchanged | Reconciliation::AbsentBoth => {}
            }
        }

        debug!(repo = %target.name, "Reconciled {} paths", change_set.paths().len());
        Ok(())
    }
}

/// Wraps a target-level failure with the repository name, keeping timeouts
/// and per-file context intact.
fn repo_err(name: &str, e: SyncError) -> SyncError {
    match e {
        SyncError::Timeout { .. } | SyncError::File { .. } => e,
        other => SyncError::repository(name, other.to_string()),
    }
}

/// Commit message carrying the human-readable date of the run.
fn commit_message() -> String {
    format!(
        "Update from blueprint gateway on {}",
        Local::now().format("%B %-d, %Y")
    )
}
