//! Change-set extraction from the gateway repository.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::RelayConfig;
use crate::error::SyncError;
use crate::repository::GitWorkspace;
use crate::sync::SyncState;
use crate::workspace::Workspace;

/// The filtered, ordered list of paths to propagate, plus the gateway tip
/// commit it was computed against.
///
/// Computed once per run and consumed read-only by every synchronizer
/// invocation; identical for every target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    paths: Vec<String>,
    tip: String,
}

impl ChangeSet {
    /// Builds a change set, dropping every path that exactly matches an
    /// exclusion entry.
    pub fn new(paths: Vec<String>, exclusions: &[String], tip: impl Into<String>) -> Self {
        let paths = paths
            .into_iter()
            .filter(|p| !exclusions.contains(p))
            .collect();
        Self {
            paths,
            tip: tip.into(),
        }
    }

    /// The paths to reconcile, in diff order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// The gateway commit this change set was diffed up to.
    pub fn tip(&self) -> &str {
        &self.tip
    }

    /// Returns true when there is nothing to propagate.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Wraps an extraction failure, keeping timeouts distinguishable.
fn extraction_err(e: SyncError) -> SyncError {
    match e {
        SyncError::Timeout { .. } => e,
        other => SyncError::extraction(other.to_string()),
    }
}

/// Extracts the change set from a freshly-cloned gateway workspace.
pub struct ChangeSetExtractor {
    config: Arc<RelayConfig>,
    state: Arc<SyncState>,
}

impl ChangeSetExtractor {
    /// Creates a new extractor.
    pub fn new(config: Arc<RelayConfig>, state: Arc<SyncState>) -> Self {
        Self { config, state }
    }

    /// Clones the gateway into `workspace`, brings the configured branch to
    /// the remote tip, and returns the filtered change set.
    ///
    /// The diff range is `watermark..HEAD` when the persisted watermark
    /// still resolves in the clone; otherwise `HEAD~1..HEAD`. A gateway
    /// branch with a single commit and no usable watermark is a fatal
    /// error.
    pub async fn extract(&self, workspace: &Workspace) -> Result<ChangeSet, SyncError> {
        let gateway = GitWorkspace::clone(
            self.config.gateway_url(),
            workspace.path(),
            self.config.clone_timeout(),
        )
        .await
        .map_err(extraction_err)?;

        let branch = self.config.gateway_branch();
        let current = gateway
            .current_branch()
            .await
            .map_err(extraction_err)?;
        if current != branch {
            gateway
                .checkout_branch(branch)
                .await
                .map_err(extraction_err)?;
        }

        gateway
            .pull_ff(branch, self.config.clone_timeout())
            .await
            .map_err(extraction_err)?;

        let since = self.resolve_watermark(&gateway).await?;
        let raw_paths = gateway
            .changed_paths(since.as_deref())
            .await
            .map_err(extraction_err)?;
        let tip = gateway
            .head_commit()
            .await
            .map_err(extraction_err)?;

        let change_set = ChangeSet::new(raw_paths, self.config.exclusions(), tip);
        info!(
            count = change_set.paths().len(),
            tip = %change_set.tip(),
            "Changed files: {:?}",
            change_set.paths()
        );

        Ok(change_set)
    }

    /// Returns the watermark commit to diff from, when one is persisted and
    /// still reachable in the clone.
    async fn resolve_watermark(&self, gateway: &GitWorkspace) -> Result<Option<String>, SyncError> {
        let Some(commit) = self.state.last_synced_commit() else {
            return Ok(None);
        };

        match gateway.commit_exists(&commit).await {
            Ok(true) => {
                debug!(watermark = %commit, "Diffing from persisted watermark");
                Ok(Some(commit))
            }
            Ok(false) => {
                debug!(
                    watermark = %commit,
                    "Watermark no longer resolves, falling back to HEAD~1"
                );
                Ok(None)
            }
            Err(e) => Err(SyncError::extraction(e.to_string())),
        }
    }
}
