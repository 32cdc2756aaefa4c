//! MineOS App Market proxy
//!
//! Forwards market API script calls upstream and caches the responses in
//! per-script bi logs, serving repeats from disk until they decay.

mod config;
mod error;
mod server;
mod store;
mod types;
mod upstream;

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::server::{start_server, ServerState, SharedState};
use crate::store::ScriptStore;
use crate::upstream::MarketClient;
use bi_response_cache::{CacheConfig, DirectoryStore, ResponseCache};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("market_proxy=info".parse()?);

    // Use JSON format for Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting MineOS Market Proxy...");

    let config = Config::from_env()?;
    info!("Port: {}", config.port);
    info!("Records dir: {:?}", config.data_dir);
    info!("Upstream: {}", config.upstream_url);
    info!("Decay: {} seconds", config.decay.as_secs());
    info!("Serialize endpoints: {}", config.serialize_endpoints);

    let directory = DirectoryStore::new(config.data_dir.clone());
    directory.init().await?;

    let cache = ResponseCache::new(
        ScriptStore::new(directory),
        CacheConfig {
            max_age: config.decay,
            serialize_endpoints: config.serialize_endpoints,
        },
    );

    let upstream = MarketClient::new(
        config.upstream_url.clone(),
        &config.user_agent,
        config.upstream_timeout,
    )
    .map_err(|e| ProxyError::Config(format!("HTTP client: {}", e)))?;

    let state: SharedState = Arc::new(ServerState::new(cache, upstream));

    // Start HTTP server (blocking)
    start_server(state, config.port)
        .await
        .map_err(|e| ProxyError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
