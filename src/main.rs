//! tokengate - password-to-token exchange and token-gated API access.
//!
//! Principals trade a password for a bearer token carrying a privilege
//! mask capped to their rank. Later requests present the token and are
//! gated on the privileges it resolves to.

mod api;
mod config;
mod db;
mod error;
mod http;
mod metrics;
mod security;
mod session;
mod state;

use crate::config::Config;
use crate::db::Database;
use crate::metrics::Metrics;
use crate::state::AppState;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(server = %config.server.name, "Starting tokengate");
    config.security.warn_weak_settings();

    let db_path = config.database_path();
    let db = Database::new(db_path).await.map_err(|e| {
        error!(path = %db_path, error = %e, "Failed to open database");
        e
    })?;
    info!(path = %db_path, "Database initialized");

    let metrics = Arc::new(Metrics::new()?);

    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.server.metrics_port.unwrap_or(9090);
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        let metrics = Arc::clone(&metrics);
        tokio::spawn(async move {
            http::run_metrics_server(metrics_port, metrics).await;
        });
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    let state = AppState::new(db, metrics, &config);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen.address)
        .await
        .map_err(|e| {
            error!(address = %config.listen.address, error = %e, "Failed to bind API listener");
            e
        })?;
    info!(address = %config.listen.address, "API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
