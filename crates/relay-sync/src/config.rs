//! Relay configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// A downstream repository that receives propagated files.
///
/// Identity is the name; it also names the target's ephemeral workspace
/// directory, so it must be unique across the configured targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryTarget {
    /// Short name used for logging and workspace isolation.
    pub name: String,
    /// Remote URL the target is cloned from and pushed to.
    pub remote_url: String,
}

impl RepositoryTarget {
    /// Creates a new target.
    pub fn new(name: impl Into<String>, remote_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_url: remote_url.into(),
        }
    }

    /// Pairs comma-separated name and URL lists positionally.
    ///
    /// # Errors
    ///
    /// Returns an error when the list lengths differ.
    pub fn pair_lists(names: &str, urls: &str) -> Result<Vec<Self>, SyncError> {
        let names: Vec<&str> = names
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let urls: Vec<&str> = urls
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if names.len() != urls.len() {
            return Err(SyncError::InvalidConfig(format!(
                "the number of repository names ({}) and URLs ({}) do not match",
                names.len(),
                urls.len()
            )));
        }

        Ok(names
            .into_iter()
            .zip(urls)
            .map(|(name, url)| Self::new(name, url))
            .collect())
    }
}

/// Immutable configuration for a relay run.
///
/// Built once at startup and passed into the orchestrator; deeper components
/// never read ambient process state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// The gateway repository URL (source of truth).
    gateway_url: String,

    /// The gateway branch whose tip is propagated.
    #[serde(default = "default_branch")]
    gateway_branch: String,

    /// The branch name used on every target repository.
    #[serde(default = "default_branch")]
    target_branch: String,

    /// Downstream repositories, in sync order.
    targets: Vec<RepositoryTarget>,

    /// Repository-relative paths excluded from propagation (exact match).
    #[serde(default)]
    exclusions: Vec<String>,

    /// Directory under which the ephemeral workspaces are created.
    #[serde(default = "default_workspace_root")]
    workspace_root: PathBuf,

    /// Path of the persisted watermark file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state_file: Option<PathBuf>,

    /// Clone/pull timeout duration.
    #[serde(default = "default_clone_timeout", with = "duration_secs")]
    clone_timeout: Duration,

    /// Push timeout duration.
    #[serde(default = "default_push_timeout", with = "duration_secs")]
    push_timeout: Duration,
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_clone_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_push_timeout() -> Duration {
    Duration::from_secs(60)
}

impl RelayConfig {
    /// Creates a new builder.
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }

    /// Returns the gateway repository URL.
    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    /// Returns the gateway branch.
    pub fn gateway_branch(&self) -> &str {
        &self.gateway_branch
    }

    /// Returns the branch used on target repositories.
    pub fn target_branch(&self) -> &str {
        &self.target_branch
    }

    /// Returns the configured targets in sync order.
    pub fn targets(&self) -> &[RepositoryTarget] {
        &self.targets
    }

    /// Returns the excluded repository-relative paths.
    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    /// Returns the workspace root directory.
    pub fn workspace_root(&self) -> &PathBuf {
        &self.workspace_root
    }

    /// Returns the watermark file path, defaulting to
    /// `<workspace root>/relay-state.json`.
    pub fn state_file(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| self.workspace_root.join("relay-state.json"))
    }

    /// Returns the clone/pull timeout.
    pub fn clone_timeout(&self) -> Duration {
        self.clone_timeout
    }

    /// Returns the push timeout.
    pub fn push_timeout(&self) -> Duration {
        self.push_timeout
    }
}

/// Builder for RelayConfig.
#[derive(Debug, Default)]
pub struct RelayConfigBuilder {
    gateway_url: Option<String>,
    gateway_branch: Option<String>,
    target_branch: Option<String>,
    targets: Vec<RepositoryTarget>,
    exclusions: Vec<String>,
    workspace_root: Option<PathBuf>,
    state_file: Option<PathBuf>,
    clone_timeout: Option<Duration>,
    push_timeout: Option<Duration>,
}

impl RelayConfigBuilder {
    /// Sets the gateway repository URL.
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Sets the gateway branch.
    pub fn gateway_branch(mut self, branch: impl Into<String>) -> Self {
        self.gateway_branch = Some(branch.into());
        self
    }

    /// Sets the branch used on target repositories.
    pub fn target_branch(mut self, branch: impl Into<String>) -> Self {
        self.target_branch = Some(branch.into());
        self
    }

    /// Adds a single target.
    pub fn target(mut self, target: RepositoryTarget) -> Self {
        self.targets.push(target);
        self
    }

    /// Sets the targets.
    pub fn targets(mut self, targets: Vec<RepositoryTarget>) -> Self {
        self.targets = targets;
        self
    }

    /// Sets the excluded paths.
    pub fn exclusions(mut self, exclusions: Vec<impl Into<String>>) -> Self {
        self.exclusions = exclusions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the workspace root directory.
    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Sets the watermark file path.
    pub fn state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    /// Sets the clone/pull timeout.
    pub fn clone_timeout(mut self, timeout: Duration) -> Self {
        self.clone_timeout = Some(timeout);
        self
    }

    /// Sets the push timeout.
    pub fn push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the gateway URL is missing or no targets are
    /// configured.
    pub fn build(self) -> Result<RelayConfig, SyncError> {
        let gateway_url = self
            .gateway_url
            .ok_or_else(|| SyncError::InvalidConfig("gateway URL is required".into()))?;

        if self.targets.is_empty() {
            return Err(SyncError::InvalidConfig(
                "at least one target repository is required".into(),
            ));
        }

        Ok(RelayConfig {
            gateway_url,
            gateway_branch: self.gateway_branch.unwrap_or_else(default_branch),
            target_branch: self.target_branch.unwrap_or_else(default_branch),
            targets: self.targets,
            exclusions: self.exclusions,
            workspace_root: self.workspace_root.unwrap_or_else(default_workspace_root),
            state_file: self.state_file,
            clone_timeout: self.clone_timeout.unwrap_or_else(default_clone_timeout),
            push_timeout: self.push_timeout.unwrap_or_else(default_push_timeout),
        })
    }
}

mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_minimal() {
        let config = RelayConfig::builder()
            .gateway_url("https://git.example.com/gateways/blueprint.git")
            .target(RepositoryTarget::new(
                "drg",
                "https://git.example.com/gateways/drg.git",
            ))
            .build()
            .unwrap();

        assert_eq!(
            config.gateway_url(),
            "https://git.example.com/gateways/blueprint.git"
        );
        assert_eq!(config.gateway_branch(), "master");
        assert_eq!(config.target_branch(), "master");
        assert_eq!(config.workspace_root(), &PathBuf::from("."));
        assert_eq!(config.state_file(), PathBuf::from("./relay-state.json"));
    }

    #[test]
    fn test_builder_full() {
        let config = RelayConfig::builder()
            .gateway_url("https://git.example.com/gateways/blueprint.git")
            .gateway_branch("develop")
            .target_branch("release")
            .targets(vec![
                RepositoryTarget::new("drg", "https://git.example.com/drg.git"),
                RepositoryTarget::new("raqeeb", "https://git.example.com/raqeeb.git"),
            ])
            .exclusions(vec![".env", "README.md"])
            .workspace_root("/var/lib/relay")
            .clone_timeout(Duration::from_secs(30))
            .push_timeout(Duration::from_secs(15))
            .build()
            .unwrap();

        assert_eq!(config.gateway_branch(), "develop");
        assert_eq!(config.target_branch(), "release");
        assert_eq!(config.targets().len(), 2);
        assert_eq!(config.exclusions(), &[".env", "README.md"]);
        assert_eq!(config.clone_timeout(), Duration::from_secs(30));
        assert_eq!(config.push_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_builder_missing_gateway_url() {
        let result = RelayConfig::builder()
            .target(RepositoryTarget::new("drg", "https://example.com/drg.git"))
            .build();

        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_no_targets() {
        let result = RelayConfig::builder()
            .gateway_url("https://example.com/blueprint.git")
            .build();

        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_pair_lists() {
        let targets = RepositoryTarget::pair_lists(
            "drg, raqeeb ,sickleaves",
            "https://a.git,https://b.git,https://c.git",
        )
        .unwrap();

        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].name, "drg");
        assert_eq!(targets[1].name, "raqeeb");
        assert_eq!(targets[1].remote_url, "https://b.git");
    }

    #[test]
    fn test_pair_lists_mismatch() {
        let result = RepositoryTarget::pair_lists("drg,raqeeb", "https://a.git");
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }
}
