//! # Status List Service
//!
//! Backend service publishing versioned status lists to a resource registry.
//!
//! ## Running
//!
//! ```bash
//! # In-memory registry (default)
//! cargo run --release -p status-service
//!
//! # Remote registry
//! export STATUS_REGISTRY_BACKEND=http
//! export STATUS_REGISTRY_URL=http://registry.local:9100
//! cargo run --release -p status-service
//! ```

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use shared::config::StatusServiceConfig;
use status_service::{api, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = StatusServiceConfig::from_env()?;
    config.validate()?;

    // Initialize logging
    let level: Level = config.log_level.parse().unwrap_or(Level::INFO);
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Status List Service");
    info!("Version: {}", shared::VERSION);
    info!(
        backend = %config.registry.backend,
        endpoint = %config.registry.endpoint,
        conditional_append = config.registry.conditional_append,
        max_publish_attempts = config.registry.max_publish_attempts,
        "Configuration loaded"
    );

    let bind_addr = config.api.bind_addr();
    let state = Arc::new(AppState::from_config(config)?);
    let app = api::create_router(state);

    info!(address = %bind_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Server running at http://{}", bind_addr);
    info!("  POST /api/v1/status-list/create  - Create a status list");
    info!("  POST /api/v1/status-list/publish - Broadcast an encoded status list");
    info!("  POST /api/v1/status-list/check   - Check one index");
    info!("  POST /api/v1/status-list/update  - Revoke, suspend or reinstate");
    info!("  GET  /api/v1/status-list/search  - List status lists of a collection");

    axum::serve(listener, app).await?;

    Ok(())
}
