//! Helpers for driving real local git repositories in tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use git2::build::RepoBuilder;
use git2::{Commit, IndexAddOption, Repository, Signature};
use tempfile::TempDir;

/// Initializes a non-bare repository with a deterministic `master` branch.
pub fn init_repo(path: &Path) -> Repository {
    std::fs::create_dir_all(path).unwrap();
    let repo = Repository::init(path).unwrap();
    // Pin the unborn branch name regardless of the host's init.defaultBranch
    repo.set_head("refs/heads/master").unwrap();
    repo
}

/// Writes `content` to `rel_path` inside the repository's working tree.
pub fn write_file(repo: &Repository, rel_path: &str, content: &[u8]) {
    let full = repo.workdir().unwrap().join(rel_path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(full, content).unwrap();
}

/// Deletes `rel_path` from the repository's working tree.
pub fn delete_file(repo: &Repository, rel_path: &str) {
    std::fs::remove_file(repo.workdir().unwrap().join(rel_path)).unwrap();
}

/// Stages everything (additions, modifications and deletions) and commits.
pub fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.update_all(["*"].iter(), None).unwrap();
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("Test Author", "test@example.com").unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// A seeded bare remote a target repository can be cloned from and pushed
/// to, together with the scratch dir that backs it.
pub struct BareRemote {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl BareRemote {
    /// URL usable by the engine (plain local path).
    pub fn url(&self) -> String {
        self.path.to_str().unwrap().to_string()
    }

    fn open(&self) -> Repository {
        Repository::open_bare(&self.path).unwrap()
    }

    /// Returns the blob content of `rel_path` at the tip of `branch`, or
    /// `None` when the path (or branch) does not exist.
    pub fn read_file(&self, branch: &str, rel_path: &str) -> Option<Vec<u8>> {
        let repo = self.open();
        let commit = repo
            .find_reference(&format!("refs/heads/{branch}"))
            .ok()?
            .peel_to_commit()
            .ok()?;
        let tree = commit.tree().ok()?;
        let entry = tree.get_path(Path::new(rel_path)).ok()?;
        let object = entry.to_object(&repo).ok()?;
        Some(object.as_blob()?.content().to_vec())
    }

    /// Returns the tip commit message of `branch`.
    pub fn head_message(&self, branch: &str) -> Option<String> {
        let repo = self.open();
        let commit = repo
            .find_reference(&format!("refs/heads/{branch}"))
            .ok()?
            .peel_to_commit()
            .ok()?;
        commit.message().map(str::to_string)
    }

    /// Returns true when `branch` exists on the remote.
    pub fn has_branch(&self, branch: &str) -> bool {
        self.open()
            .find_reference(&format!("refs/heads/{branch}"))
            .is_ok()
    }

    /// Returns the tip commit id of `branch`.
    pub fn head_commit(&self, branch: &str) -> Option<String> {
        let repo = self.open();
        let commit = repo
            .find_reference(&format!("refs/heads/{branch}"))
            .ok()?
            .peel_to_commit()
            .ok()?;
        Some(commit.id().to_string())
    }
}

/// Creates a bare remote seeded with the given files in one initial commit
/// on `master`.
pub fn seed_bare_remote(files: &[(&str, &[u8])]) -> BareRemote {
    let dir = TempDir::new().unwrap();
    let seed_path = dir.path().join("seed");
    let bare_path = dir.path().join("remote.git");

    let seed = init_repo(&seed_path);
    for (rel_path, content) in files {
        write_file(&seed, rel_path, content);
    }
    commit_all(&seed, "seed");

    RepoBuilder::new()
        .bare(true)
        .clone(seed_path.to_str().unwrap(), &bare_path)
        .unwrap();

    BareRemote {
        dir,
        path: bare_path,
    }
}

/// A gateway origin repository the engine clones and pulls from.
pub struct GatewayOrigin {
    pub dir: TempDir,
    pub repo: Repository,
}

impl GatewayOrigin {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir.path().join("gateway"));
        Self { dir, repo }
    }

    /// URL usable by the engine (plain local path).
    pub fn url(&self) -> String {
        self.repo.workdir().unwrap().to_str().unwrap().to_string()
    }
}
