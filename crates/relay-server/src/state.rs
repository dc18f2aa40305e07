//! Application state.

use std::sync::Arc;

use relay_sync::{SyncOrchestrator, SyncService};
use tokio::sync::Mutex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The sync engine.
    sync_service: Arc<dyn SyncService>,
    /// Serializes runs: concurrent runs would collide on the workspaces.
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Creates a new AppState with the given sync service.
    pub fn new(sync_service: Arc<dyn SyncService>) -> Self {
        Self {
            sync_service,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Creates an AppState from a SyncOrchestrator.
    pub fn from_orchestrator(orchestrator: SyncOrchestrator) -> Self {
        Self::new(Arc::new(orchestrator))
    }

    /// Returns a reference to the sync service.
    pub fn sync_service(&self) -> &dyn SyncService {
        self.sync_service.as_ref()
    }

    /// Returns the run lock.
    pub fn run_lock(&self) -> &Mutex<()> {
        &self.run_lock
    }
}
