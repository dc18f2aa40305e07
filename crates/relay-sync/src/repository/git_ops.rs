//! Git operations using git2, wrapped for the async orchestration flow.

use std::path::{Path, PathBuf};
use std::time::Duration;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{BranchType, Repository, Signature, StatusOptions};
use tracing::{debug, info};

use crate::error::SyncError;

/// A cloned repository inside one run workspace.
///
/// Every operation is a blocking libgit2 call executed on the blocking pool;
/// the orchestration flow awaits each call before proceeding. Network-facing
/// operations (clone, pull, push) run under an explicit deadline and report
/// `SyncError::Timeout` when it elapses.
pub struct GitWorkspace {
    path: PathBuf,
}

impl GitWorkspace {
    /// Clones `url` into `path` and returns a handle to the clone.
    pub async fn clone(
        url: &str,
        path: &Path,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let url = url.to_string();
        let path = path.to_path_buf();

        info!(url = %url, path = %path.display(), "Cloning repository");

        let cloned_path = path.clone();
        let task = tokio::task::spawn_blocking(move || Self::clone_blocking(&url, &cloned_path));
        with_deadline(task, timeout).await??;

        Ok(Self { path })
    }

    /// Opens an already-cloned workspace.
    pub fn open(path: &Path) -> Result<Self, SyncError> {
        // Validate eagerly so later calls fail with context, not surprise
        Repository::open(path).map_err(|e| {
            SyncError::git(format!("failed to open repo at {}: {}", path.display(), e))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Returns the workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn clone_blocking(url: &str, path: &Path) -> Result<(), SyncError> {
        RepoBuilder::new()
            .clone(url, path)
            .map_err(|e| SyncError::git(format!("failed to clone {}: {}", url, e)))?;
        Ok(())
    }

    /// Returns the shorthand name of the checked-out branch.
    pub async fn current_branch(&self) -> Result<String, SyncError> {
        let path = self.path.clone();
        run_blocking(move || {
            let repo = open(&path)?;
            let head = repo.head().map_err(SyncError::from)?;
            Ok(head.shorthand().unwrap_or("HEAD").to_string())
        })
        .await
    }

    /// Returns true when `origin/<branch>` exists in the clone.
    pub async fn has_remote_branch(&self, branch: &str) -> Result<bool, SyncError> {
        let path = self.path.clone();
        let branch = branch.to_string();
        run_blocking(move || {
            let repo = open(&path)?;
            Ok(repo
                .find_branch(&format!("origin/{branch}"), BranchType::Remote)
                .is_ok())
        })
        .await
    }

    /// Checks out `branch`, creating a local tracking branch from
    /// `origin/<branch>` when no local branch exists yet.
    pub async fn checkout_branch(&self, branch: &str) -> Result<(), SyncError> {
        let path = self.path.clone();
        let branch = branch.to_string();
        run_blocking(move || {
            let repo = open(&path)?;
            checkout_tracking(&repo, &branch)
        })
        .await
    }

    /// Creates `branch` at HEAD, checks it out, and pushes it upstream with
    /// tracking established.
    pub async fn create_branch_and_push(
        &self,
        branch: &str,
        timeout: Duration,
    ) -> Result<(), SyncError> {
        let path = self.path.clone();
        let name = branch.to_string();
        info!(branch = %branch, "Branch does not exist on remote, creating it");

        let task = tokio::task::spawn_blocking(move || -> Result<(), SyncError> {
            let repo = open(&path)?;
            let head_commit = repo.head()?.peel_to_commit()?;
            repo.branch(&name, &head_commit, false)?;
            repo.set_head(&format!("refs/heads/{name}"))?;
            repo.checkout_head(Some(CheckoutBuilder::new().force()))?;

            let mut remote = repo.find_remote("origin")?;
            let refspec = format!("refs/heads/{name}:refs/heads/{name}");
            remote
                .push(&[refspec.as_str()], None)
                .map_err(|e| SyncError::git(format!("failed to push new branch {name}: {e}")))?;

            // Tracking, the `-u` part
            repo.find_branch(&name, BranchType::Local)?
                .set_upstream(Some(&format!("origin/{name}")))?;
            Ok(())
        });
        with_deadline(task, timeout).await?
    }

    /// Fetches `branch` from origin and fast-forwards the local branch.
    pub async fn pull_ff(&self, branch: &str, timeout: Duration) -> Result<(), SyncError> {
        let path = self.path.clone();
        let name = branch.to_string();

        let task = tokio::task::spawn_blocking(move || -> Result<(), SyncError> {
            let repo = open(&path)?;
            let mut remote = repo.find_remote("origin")?;
            remote
                .fetch(&[name.as_str()], None, None)
                .map_err(|e| SyncError::git(format!("failed to fetch {name}: {e}")))?;
            fast_forward(&repo, &name)
        });
        with_deadline(task, timeout).await?
    }

    /// Returns the HEAD commit id.
    pub async fn head_commit(&self) -> Result<String, SyncError> {
        let path = self.path.clone();
        run_blocking(move || {
            let repo = open(&path)?;
            let commit = repo.head()?.peel_to_commit()?;
            Ok(commit.id().to_string())
        })
        .await
    }

    /// Returns true when `sha` resolves to a commit in the clone.
    pub async fn commit_exists(&self, sha: &str) -> Result<bool, SyncError> {
        let path = self.path.clone();
        let sha = sha.to_string();
        run_blocking(move || {
            let repo = open(&path)?;
            let oid = match git2::Oid::from_str(&sha) {
                Ok(oid) => oid,
                Err(_) => return Ok(false),
            };
            Ok(repo.find_commit(oid).is_ok())
        })
        .await
    }

    /// Returns the paths that differ between `since` (or HEAD~1 when `None`)
    /// and HEAD, in diff order, deduplicated.
    pub async fn changed_paths(&self, since: Option<&str>) -> Result<Vec<String>, SyncError> {
        let path = self.path.clone();
        let since = since.map(str::to_string);
        run_blocking(move || {
            let repo = open(&path)?;
            let head = repo.head()?.peel_to_commit()?;
            let new_tree = head.tree()?;

            let old_tree = match since {
                Some(sha) => {
                    let oid = git2::Oid::from_str(&sha)
                        .map_err(|e| SyncError::git(format!("invalid watermark {sha}: {e}")))?;
                    repo.find_commit(oid)?.tree()?
                }
                None => head
                    .parent(0)
                    .map_err(|e| {
                        SyncError::git(format!("HEAD~1 does not resolve: {e}"))
                    })?
                    .tree()?,
            };

            let diff = repo.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;
            let mut paths = Vec::new();
            for delta in diff.deltas() {
                let file_path = delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path());
                if let Some(p) = file_path {
                    let p = p.to_string_lossy().into_owned();
                    if !paths.contains(&p) {
                        paths.push(p);
                    }
                }
            }
            Ok(paths)
        })
        .await
    }

    /// Stages an added or modified path.
    pub async fn stage_path(&self, rel_path: &str) -> Result<(), SyncError> {
        let path = self.path.clone();
        let rel = rel_path.to_string();
        run_blocking(move || {
            let repo = open(&path)?;
            let mut index = repo.index()?;
            index.add_path(Path::new(&rel))?;
            index.write()?;
            Ok(())
        })
        .await
    }

    /// Stages the removal of a path.
    pub async fn stage_removal(&self, rel_path: &str) -> Result<(), SyncError> {
        let path = self.path.clone();
        let rel = rel_path.to_string();
        run_blocking(move || {
            let repo = open(&path)?;
            let mut index = repo.index()?;
            index.remove_path(Path::new(&rel))?;
            index.write()?;
            Ok(())
        })
        .await
    }

    /// Returns true when the working tree has no staged or unstaged changes.
    pub async fn is_clean(&self) -> Result<bool, SyncError> {
        let path = self.path.clone();
        run_blocking(move || {
            let repo = open(&path)?;
            let mut opts = StatusOptions::new();
            opts.include_untracked(true).recurse_untracked_dirs(true);
            let statuses = repo.statuses(Some(&mut opts))?;
            Ok(statuses.is_empty())
        })
        .await
    }

    /// Creates a commit from the index, covering all staged changes.
    pub async fn commit(&self, message: &str) -> Result<String, SyncError> {
        let path = self.path.clone();
        let message = message.to_string();
        run_blocking(move || {
            let repo = open(&path)?;
            let mut index = repo.index()?;
            let tree_id = index.write_tree()?;
            let tree = repo.find_tree(tree_id)?;

            let sig = repo
                .signature()
                .or_else(|_| Signature::now("Gateway Relay", "relay@localhost"))?;
            let parent = repo.head()?.peel_to_commit()?;

            let oid = repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &[&parent])?;
            debug!(commit = %oid, "Created commit");
            Ok(oid.to_string())
        })
        .await
    }

    /// Pushes `branch` to origin.
    pub async fn push(&self, branch: &str, timeout: Duration) -> Result<(), SyncError> {
        let path = self.path.clone();
        let name = branch.to_string();

        let task = tokio::task::spawn_blocking(move || -> Result<(), SyncError> {
            let repo = open(&path)?;
            let mut remote = repo.find_remote("origin")?;
            let refspec = format!("refs/heads/{name}:refs/heads/{name}");
            remote
                .push(&[refspec.as_str()], None)
                .map_err(|e| SyncError::git(format!("failed to push {name}: {e}")))?;
            Ok(())
        });
        with_deadline(task, timeout).await?
    }
}

impl std::fmt::Debug for GitWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitWorkspace")
            .field("path", &self.path)
            .finish()
    }
}

fn open(path: &Path) -> Result<Repository, SyncError> {
    Repository::open(path)
        .map_err(|e| SyncError::git(format!("failed to open repo at {}: {}", path.display(), e)))
}

/// Checks out `branch`, creating the local branch from `origin/<branch>`
/// with tracking when it only exists remotely.
fn checkout_tracking(repo: &Repository, branch: &str) -> Result<(), SyncError> {
    if repo.find_branch(branch, BranchType::Local).is_err() {
        let remote_branch = repo
            .find_branch(&format!("origin/{branch}"), BranchType::Remote)
            .map_err(|_| SyncError::git(format!("branch {branch} not found")))?;
        let commit = remote_branch.get().peel_to_commit()?;
        let mut local = repo.branch(branch, &commit, false)?;
        local.set_upstream(Some(&format!("origin/{branch}")))?;
    }

    repo.set_head(&format!("refs/heads/{branch}"))?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    Ok(())
}

/// Fast-forwards the local `branch` to `origin/<branch>`.
///
/// A diverged local branch is an error; this engine never merges.
fn fast_forward(repo: &Repository, branch: &str) -> Result<(), SyncError> {
    let upstream = repo
        .find_reference(&format!("refs/remotes/origin/{branch}"))?
        .peel_to_commit()?;
    let head = repo.head()?.peel_to_commit()?;

    if head.id() == upstream.id() {
        return Ok(());
    }

    let base = repo.merge_base(head.id(), upstream.id())?;
    if base != head.id() {
        return Err(SyncError::git(format!(
            "branch {branch} has diverged from origin, cannot fast-forward"
        )));
    }

    let mut local_ref = repo.find_reference(&format!("refs/heads/{branch}"))?;
    local_ref.set_target(upstream.id(), "fast-forward")?;
    repo.set_head(&format!("refs/heads/{branch}"))?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    Ok(())
}

async fn run_blocking<T, F>(f: F) -> Result<T, SyncError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SyncError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SyncError::git(format!("git task failed: {e}")))?
}

/// Awaits a blocking git task under a deadline.
async fn with_deadline<T>(
    task: tokio::task::JoinHandle<Result<T, SyncError>>,
    timeout: Duration,
) -> Result<Result<T, SyncError>, SyncError> {
    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined.map_err(|e| SyncError::git(format!("git task failed: {e}"))),
        Err(_) => Err(SyncError::Timeout {
            seconds: timeout.as_secs(),
        }),
    }
}
