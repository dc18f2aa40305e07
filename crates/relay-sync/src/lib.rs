//! # Gateway Relay Sync Engine
//!
//! Propagates the files changed at the tip of a gateway ("source of truth")
//! repository into a set of downstream target repositories.
//!
//! A run clones the gateway, computes the changed paths since the last
//! successfully propagated commit (falling back to the newest commit's
//! diff), then for each target clones it, reconciles every path
//! (copy/overwrite/delete/skip on byte equality), and commits and pushes
//! only when the working tree ended up dirty.
//!
//! ## Example
//!
//! ```ignore
//! use relay_sync::{RelayConfig, RepositoryTarget, SyncOrchestrator, SyncService};
//!
//! let config = RelayConfig::builder()
//!     .gateway_url("https://git.example.com/gateways/blueprint.git")
//!     .target(RepositoryTarget::new("drg", "https://git.example.com/gateways/drg.git"))
//!     .build()?;
//!
//! let orchestrator = SyncOrchestrator::new(config);
//! let report = orchestrator.run().await?;
//! println!("{}", report.message);
//! ```

pub mod changeset;
pub mod config;
pub mod error;
pub mod repository;
pub mod sync;
pub mod workspace;

// Re-exports
pub use changeset::{ChangeSet, ChangeSetExtractor};
pub use config::{RelayConfig, RelayConfigBuilder, RepositoryTarget};
pub use error::SyncError;
pub use repository::GitWorkspace;
pub use sync::{
    ByteCompare, ContentCompare, Reconciler, Reconciliation, RepositorySynchronizer, RunReport,
    SyncOrchestrator, SyncOutcome, SyncService, SyncState, TargetReport,
};
pub use workspace::Workspace;
