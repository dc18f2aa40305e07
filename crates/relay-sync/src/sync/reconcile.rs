//! Per-path reconciliation between the gateway and a target workspace.

use std::path::Path;

use tracing::debug;

use crate::error::SyncError;

/// Decides whether two files hold the same content.
///
/// The engine only needs equality, so the comparison can be swapped for a
/// hash-based implementation without touching call sites.
pub trait ContentCompare: Send + Sync {
    /// Returns true when both files hold identical content.
    fn identical(&self, a: &Path, b: &Path) -> std::io::Result<bool>;
}

/// Byte-for-byte file comparison.
#[derive(Debug, Default)]
pub struct ByteCompare;

impl ContentCompare for ByteCompare {
    fn identical(&self, a: &Path, b: &Path) -> std::io::Result<bool> {
        let left = std::fs::read(a)?;
        let right = std::fs::read(b)?;
        Ok(left == right)
    }
}

/// What the reconciler did for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The source bytes were written over the target (new or modified file);
    /// the path must be staged as an addition/modification.
    Copied,
    /// The file was deleted at the gateway tip and removed from the target;
    /// the path must be staged as a removal.
    Deleted,
    /// Target content already matched the source; nothing written.
    Unchanged,
    /// Absent on both sides; nothing to do.
    AbsentBoth,
}

/// Applies the copy/delete/skip decision for individual paths.
pub struct Reconciler {
    comparator: Box<dyn ContentCompare>,
}

impl Reconciler {
    /// Creates a reconciler with the given comparison capability.
    pub fn new(comparator: Box<dyn ContentCompare>) -> Self {
        Self { comparator }
    }

    /// Reconciles one repository-relative path between the two workspaces.
    ///
    /// Each path is handled independently; a filesystem failure is wrapped
    /// with the file name and aborts the caller.
    pub fn reconcile(
        &self,
        source_root: &Path,
        target_root: &Path,
        rel_path: &str,
    ) -> Result<Reconciliation, SyncError> {
        let source = source_root.join(rel_path);
        let target = target_root.join(rel_path);

        if !source.exists() {
            if target.exists() {
                remove(&target, rel_path)?;
                debug!(file = rel_path, "Deleted file from target repository");
                return Ok(Reconciliation::Deleted);
            }
            debug!(file = rel_path, "Already deleted in both source and target, skipping");
            return Ok(Reconciliation::AbsentBoth);
        }

        if target.exists() {
            let same = self
                .comparator
                .identical(&source, &target)
                .map_err(|e| SyncError::file(rel_path, e.to_string()))?;
            if same {
                debug!(file = rel_path, "Identical to target, skipping");
                return Ok(Reconciliation::Unchanged);
            }
        }

        copy(&source, &target, rel_path)?;
        debug!(file = rel_path, "Copied file to target repository");
        Ok(Reconciliation::Copied)
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(Box::new(ByteCompare))
    }
}

fn remove(target: &Path, rel_path: &str) -> Result<(), SyncError> {
    std::fs::remove_file(target).map_err(|e| SyncError::file(rel_path, e.to_string()))
}

fn copy(source: &Path, target: &Path, rel_path: &str) -> Result<(), SyncError> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SyncError::file(rel_path, e.to_string()))?;
    }
    std::fs::copy(source, target).map_err(|e| SyncError::file(rel_path, e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TempDir) {
        (TempDir::new().unwrap(), TempDir::new().unwrap())
    }

    #[test]
    fn test_new_file_is_copied() {
        let (source, target) = setup();
        std::fs::write(source.path().join("a.txt"), b"hello").unwrap();

        let outcome = Reconciler::default()
            .reconcile(source.path(), target.path(), "a.txt")
            .unwrap();

        assert_eq!(outcome, Reconciliation::Copied);
        assert_eq!(
            std::fs::read(target.path().join("a.txt")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_modified_file_is_overwritten() {
        let (source, target) = setup();
        std::fs::write(source.path().join("a.txt"), b"new").unwrap();
        std::fs::write(target.path().join("a.txt"), b"old").unwrap();

        let outcome = Reconciler::default()
            .reconcile(source.path(), target.path(), "a.txt")
            .unwrap();

        assert_eq!(outcome, Reconciliation::Copied);
        assert_eq!(std::fs::read(target.path().join("a.txt")).unwrap(), b"new");
    }

    #[test]
    fn test_nested_parent_dirs_are_created() {
        let (source, target) = setup();
        std::fs::create_dir_all(source.path().join("src/deep")).unwrap();
        std::fs::write(source.path().join("src/deep/a.txt"), b"x").unwrap();

        let outcome = Reconciler::default()
            .reconcile(source.path(), target.path(), "src/deep/a.txt")
            .unwrap();

        assert_eq!(outcome, Reconciliation::Copied);
        assert!(target.path().join("src/deep/a.txt").exists());
    }

    #[test]
    fn test_deleted_source_removes_target() {
        let (source, target) = setup();
        std::fs::write(target.path().join("gone.txt"), b"bye").unwrap();

        let outcome = Reconciler::default()
            .reconcile(source.path(), target.path(), "gone.txt")
            .unwrap();

        assert_eq!(outcome, Reconciliation::Deleted);
        assert!(!target.path().join("gone.txt").exists());
    }

    #[test]
    fn test_absent_on_both_sides_is_noop() {
        let (source, target) = setup();

        let outcome = Reconciler::default()
            .reconcile(source.path(), target.path(), "never-there.txt")
            .unwrap();

        assert_eq!(outcome, Reconciliation::AbsentBoth);
    }

    #[derive(Default)]
    struct CountingCompare {
        calls: Arc<AtomicUsize>,
    }

    impl ContentCompare for CountingCompare {
        fn identical(&self, a: &Path, b: &Path) -> std::io::Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ByteCompare.identical(a, b)
        }
    }

    #[test]
    fn test_identical_file_is_skipped_without_write() {
        let (source, target) = setup();
        std::fs::write(source.path().join("same.txt"), b"same bytes").unwrap();
        std::fs::write(target.path().join("same.txt"), b"same bytes").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let reconciler = Reconciler::new(Box::new(CountingCompare {
            calls: Arc::clone(&calls),
        }));

        let before = std::fs::metadata(target.path().join("same.txt"))
            .unwrap()
            .modified()
            .unwrap();

        let outcome = reconciler
            .reconcile(source.path(), target.path(), "same.txt")
            .unwrap();

        assert_eq!(outcome, Reconciliation::Unchanged);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let after = std::fs::metadata(target.path().join("same.txt"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_comparator_not_consulted_for_new_file() {
        let (source, target) = setup();
        std::fs::write(source.path().join("new.txt"), b"x").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let reconciler = Reconciler::new(Box::new(CountingCompare {
            calls: Arc::clone(&calls),
        }));

        reconciler
            .reconcile(source.path(), target.path(), "new.txt")
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
