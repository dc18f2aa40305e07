//! Run orchestration across all configured targets.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::changeset::ChangeSetExtractor;
use crate::config::RelayConfig;
use crate::error::SyncError;
use crate::sync::state::SyncState;
use crate::sync::synchronizer::{RepositorySynchronizer, SyncOutcome};
use crate::workspace::Workspace;

/// Outcome of one target within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    /// The target repository name.
    pub name: String,
    /// What happened to it.
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

/// Summary of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Human-readable run summary.
    pub message: String,
    /// Per-target outcomes, in sync order. Empty when the change set was
    /// empty and no target was contacted.
    pub targets: Vec<TargetReport>,
}

impl RunReport {
    /// Report for a run with nothing to propagate.
    pub fn no_changes() -> Self {
        Self {
            message: "No changed files to update.".to_string(),
            targets: Vec::new(),
        }
    }

    /// Returns true when no target failed.
    pub fn is_success(&self) -> bool {
        self.targets
            .iter()
            .all(|t| !matches!(t.outcome, SyncOutcome::Failed(_)))
    }
}

/// Executes a sync run on demand.
///
/// The HTTP layer depends on this seam instead of the concrete
/// orchestrator so it can be exercised with a stub.
#[async_trait]
pub trait SyncService: Send + Sync {
    /// Runs one end-to-end sync and reports per-target outcomes.
    async fn run(&self) -> Result<RunReport, SyncError>;
}

/// Drives one run: extract the gateway change set once, then fan it out
/// to every target sequentially, cleaning up workspaces regardless of
/// per-target outcome.
pub struct SyncOrchestrator {
    config: Arc<RelayConfig>,
    state: Arc<SyncState>,
    extractor: ChangeSetExtractor,
    synchronizer: RepositorySynchronizer,
}

impl SyncOrchestrator {
    /// Creates an orchestrator, loading the persisted watermark.
    pub fn new(config: RelayConfig) -> Self {
        let state = Arc::new(SyncState::load(config.state_file()));
        let config = Arc::new(config);

        Self {
            extractor: ChangeSetExtractor::new(Arc::clone(&config), Arc::clone(&state)),
            synchronizer: RepositorySynchronizer::new(Arc::clone(&config)),
            config,
            state,
        }
    }

    async fn run_inner(&self) -> Result<RunReport, SyncError> {
        let gateway_ws = Workspace::gateway(self.config.workspace_root());
        gateway_ws.prepare()?;

        // Extraction failures are fatal: nothing has been touched yet.
        let change_set = match self.extractor.extract(&gateway_ws).await {
            Ok(cs) => cs,
            Err(e) => {
                gateway_ws.cleanup();
                return Err(e);
            }
        };

        if change_set.is_empty() {
            info!("No changed files to update");
            gateway_ws.cleanup();
            return Ok(RunReport::no_changes());
        }

        let mut targets = Vec::with_capacity(self.config.targets().len());
        for target in self.config.targets() {
            let ws = Workspace::target(self.config.workspace_root(), &target.name);

            let outcome = match ws.prepare() {
                Ok(()) => self
                    .synchronizer
                    .sync(target, &change_set, &gateway_ws, &ws)
                    .await
                    .unwrap_or_else(|e| {
                        error!(repo = %target.name, error = %e, "Target sync failed");
                        SyncOutcome::Failed(e.to_string())
                    }),
                Err(e) => {
                    error!(repo = %target.name, error = %e, "Workspace preparation failed");
                    SyncOutcome::Failed(e.to_string())
                }
            };

            // Cleanup never throws and never blocks the next target
            ws.cleanup();

            targets.push(TargetReport {
                name: target.name.clone(),
                outcome,
            });
        }

        gateway_ws.cleanup();

        let failed = targets
            .iter()
            .filter(|t| matches!(t.outcome, SyncOutcome::Failed(_)))
            .count();

        if failed == 0 {
            // Only advance the watermark once every target has the tip;
            // otherwise a failed target would miss this range forever.
            if let Err(e) = self.state.record_synced(change_set.tip()) {
                warn!(error = %e, "Failed to persist sync watermark");
            }
        }

        let message = if failed == 0 {
            "Repositories updated successfully.".to_string()
        } else {
            format!("{failed} of {} repositories failed to update.", targets.len())
        };

        Ok(RunReport { message, targets })
    }
}

#[async_trait]
impl SyncService for SyncOrchestrator {
    async fn run(&self) -> Result<RunReport, SyncError> {
        self.run_inner().await
    }
}
