//! Reconciliation and orchestration of sync runs.

mod orchestrator;
mod reconcile;
mod state;
mod synchronizer;

pub use orchestrator::{RunReport, SyncOrchestrator, SyncService, TargetReport};
pub use reconcile::{ByteCompare, ContentCompare, Reconciler, Reconciliation};
pub use state::SyncState;
pub use synchronizer::{RepositorySynchronizer, SyncOutcome};
