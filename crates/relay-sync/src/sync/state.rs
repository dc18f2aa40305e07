//! Persisted sync watermark.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SyncError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    /// The gateway commit last propagated to every target.
    last_synced_commit: Option<String>,
}

/// Tracks the last gateway commit that was successfully propagated to every
/// target, persisted as JSON so the next run can diff from it instead of
/// only seeing the newest commit.
#[derive(Debug)]
pub struct SyncState {
    path: PathBuf,
    inner: RwLock<PersistedState>,
}

impl SyncState {
    /// Loads the state from `path`, starting empty when the file is absent
    /// or unreadable (a corrupt state file falls back to the HEAD~1 diff,
    /// it never blocks a run).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let inner = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring corrupt state file");
                    PersistedState::default()
                }
            },
            Err(_) => PersistedState::default(),
        };

        Self {
            path,
            inner: RwLock::new(inner),
        }
    }

    /// Returns the watermark commit, if one has been recorded.
    pub fn last_synced_commit(&self) -> Option<String> {
        self.inner.read().last_synced_commit.clone()
    }

    /// Records `commit` as fully propagated and persists it.
    pub fn record_synced(&self, commit: impl Into<String>) -> Result<(), SyncError> {
        let commit = commit.into();
        {
            let mut inner = self.inner.write();
            inner.last_synced_commit = Some(commit.clone());
        }
        self.persist()?;
        debug!(commit = %commit, "Advanced sync watermark");
        Ok(())
    }

    fn persist(&self) -> Result<(), SyncError> {
        let bytes = {
            let inner = self.inner.read();
            serde_json::to_vec_pretty(&*inner)
                .map_err(|e| SyncError::git(format!("failed to serialize state: {e}")))?
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    /// Returns the state file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
