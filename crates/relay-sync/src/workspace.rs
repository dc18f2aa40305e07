//! Ephemeral run workspaces.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::SyncError;

/// Directory name for the gateway clone.
const GATEWAY_DIR: &str = "temp-gateway";

/// An ephemeral working directory bound to one repository for one run.
///
/// The component that creates a workspace owns it exclusively and removes it
/// before the run ends. Removal is best-effort: a cleanup failure is logged
/// and never propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Workspace for the gateway clone, under `root`.
    pub fn gateway(root: &Path) -> Self {
        Self {
            path: root.join(GATEWAY_DIR),
        }
    }

    /// Workspace for one target repository, under `root`.
    ///
    /// Names are derived from repository identity, so no two targets ever
    /// alias the same path.
    pub fn target(root: &Path, name: &str) -> Self {
        Self {
            path: root.join(format!("temp-{name}")),
        }
    }

    /// Returns the workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes any leftover directory and recreates it empty.
    pub fn prepare(&self) -> Result<(), SyncError> {
        if self.path.exists() {
            debug!(path = %self.path.display(), "Removing stale workspace");
            std::fs::remove_dir_all(&self.path)?;
        }
        std::fs::create_dir_all(&self.path)?;
        Ok(())
    }

    /// Removes the workspace directory, logging instead of failing.
    pub fn cleanup(&self) {
        if !self.path.exists() {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Cleaned up workspace"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to clean up workspace"
            ),
        }
    }
}
