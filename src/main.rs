//! rosterd - session roster and admission daemon.
//!
//! Keeps community sport sessions (rosters, waitlists, attendance) behind
//! a JSON API, with one actor task per session owning its document.

mod api;
mod config;
mod db;
mod directory;
mod error;
mod metrics;
mod state;
mod sweep;

use crate::config::Config;
use crate::db::Database;
use crate::directory::Directory;
use crate::state::Registry;
use roster_engine::model::SessionStatus;
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

    info!(name = %config.server.name, "Starting rosterd");

    // Initialize database
    let db_path = config
        .database
        .as_ref()
        .map(|d| d.path.as_str())
        .unwrap_or("rosterd.db");
    let db = Database::new(db_path).await?;

    // Load the user directory into memory
    let directory = Directory::load(db.clone()).await?;

    // Prometheus metrics are optional.
    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.server.metrics_port.unwrap_or(9090);
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        info!("Metrics initialized");

        tokio::spawn(async move {
            api::run_metrics_server(metrics_port).await;
        });
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    // Revive one actor per persisted session
    let registry = Arc::new(Registry::new());
    let sessions = db.sessions().load_all().await?;
    let open = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Open)
        .count();
    for session in sessions {
        registry.spawn(session, db.clone(), directory.clone());
    }
    metrics::set_open_sessions(open as i64);
    info!(total = registry.len(), open, "Sessions loaded");

    // Start the stale-session sweep
    sweep::spawn_sweep_task(Arc::clone(&registry), config.sweep.interval_secs);
    info!(
        interval_secs = config.sweep.interval_secs,
        "Sweep task started"
    );

    // Serve the API in the foreground
    let app_state = api::AppState {
        registry,
        directory,
        db,
        create_lock: Arc::new(tokio::sync::Mutex::new(())),
    };
    api::serve(app_state, config.server.bind).await?;

    Ok(())
}
