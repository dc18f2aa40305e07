//! Gateway Relay server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use relay_sync::{RelayConfig, RepositoryTarget, SyncOrchestrator};
use relay_server::{AppState, run_server_with_state};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get server configuration from environment
    let host = std::env::var("RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("RELAY_PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .expect("RELAY_PORT must be a valid port number");

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid address");

    // Get gateway configuration from environment
    let gateway_url = std::env::var("GATEWAY_REPO_URL")
        .expect("GATEWAY_REPO_URL environment variable is required");
    let gateway_branch = std::env::var("GATEWAY_BRANCH").unwrap_or_else(|_| "master".to_string());
    let target_branch = std::env::var("REPO_BRANCH").unwrap_or_else(|_| "master".to_string());

    let names =
        std::env::var("REPOS_NAMES").expect("REPOS_NAMES environment variable is required");
    let urls = std::env::var("REPOS_URLS").expect("REPOS_URLS environment variable is required");
    let targets =
        RepositoryTarget::pair_lists(&names, &urls).expect("REPOS_NAMES and REPOS_URLS mismatch");

    // Build relay configuration
    let mut config_builder = RelayConfig::builder()
        .gateway_url(&gateway_url)
        .gateway_branch(&gateway_branch)
        .target_branch(&target_branch)
        .targets(targets);

    // Add exclusions if configured
    if let Ok(excludes) = std::env::var("EXCLUDE_FILES") {
        let paths: Vec<String> = excludes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        config_builder = config_builder.exclusions(paths);
    }

    if let Ok(root) = std::env::var("RELAY_WORKSPACE_ROOT") {
        config_builder = config_builder.workspace_root(PathBuf::from(root));
    }

    if let Ok(state_file) = std::env::var("RELAY_STATE_FILE") {
        config_builder = config_builder.state_file(PathBuf::from(state_file));
    }

    if let Ok(secs) = std::env::var("RELAY_CLONE_TIMEOUT_SECS") {
        let secs = secs
            .parse::<u64>()
            .expect("RELAY_CLONE_TIMEOUT_SECS must be a number of seconds");
        config_builder = config_builder.clone_timeout(Duration::from_secs(secs));
    }

    if let Ok(secs) = std::env::var("RELAY_PUSH_TIMEOUT_SECS") {
        let secs = secs
            .parse::<u64>()
            .expect("RELAY_PUSH_TIMEOUT_SECS must be a number of seconds");
        config_builder = config_builder.push_timeout(Duration::from_secs(secs));
    }

    let config = config_builder
        .build()
        .expect("Failed to build relay configuration");

    tracing::info!("Starting Gateway Relay v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Gateway repository: {}", gateway_url);
    tracing::info!("Gateway branch: {}", gateway_branch);
    tracing::info!("Target branch: {}", target_branch);
    tracing::info!("Targets: {}", config.targets().len());

    // Create application state
    let state = AppState::from_orchestrator(SyncOrchestrator::new(config));

    // Run server
    run_server_with_state(addr, state).await?;

    Ok(())
}
