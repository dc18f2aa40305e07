//! Error types for the sync engine.

use std::path::PathBuf;

/// Errors that can occur while propagating gateway changes.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A Git operation failed.
    #[error("git error: {0}")]
    Git(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A network-facing operation exceeded its deadline.
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Extracting the change set from the gateway failed.
    #[error("failed to get changed files: {0}")]
    Extraction(String),

    /// Reconciling a single file failed.
    #[error("failed to copy file {}: {reason}", path.display())]
    File { path: PathBuf, reason: String },

    /// Synchronizing a target repository failed.
    #[error("failed to update {name}: {reason}")]
    Repository { name: String, reason: String },
}

impl SyncError {
    /// Creates a new Git error.
    pub fn git(msg: impl Into<String>) -> Self {
        Self::Git(msg.into())
    }

    /// Creates a new extraction error.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Creates a new per-file error.
    pub fn file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new per-repository error.
    pub fn repository(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Repository {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<git2::Error> for SyncError {
    fn from(err: git2::Error) -> Self {
        Self::Git(err.message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::git("failed to clone");
        assert_eq!(err.to_string(), "git error: failed to clone");

        let err = SyncError::extraction("HEAD~1 does not resolve");
        assert_eq!(
            err.to_string(),
            "failed to get changed files: HEAD~1 does not resolve"
        );

        let err = SyncError::file("src/a.txt", "permission denied");
        assert_eq!(
            err.to_string(),
            "failed to copy file src/a.txt: permission denied"
        );

        let err = SyncError::repository("drg", "push rejected");
        assert_eq!(err.to_string(), "failed to update drg: push rejected");
    }

    #[test]
    fn test_timeout_display() {
        let err = SyncError::Timeout { seconds: 120 };
        assert_eq!(err.to_string(), "operation timed out after 120s");
    }
}
