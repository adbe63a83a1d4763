//! # laurel-server
//!
//! HTTP front of the Laurel badge engine.
//!
//! This binary provides:
//! - **Trigger intake** for the learning and community subsystems, which call
//!   `POST /triggers` once their own change has committed
//! - **User badge listing** with seen/unseen acknowledgement
//! - **Admin API** for the badge catalog and manual grants, behind a bearer
//!   token

mod api;
mod config;
mod error;

use std::sync::Arc;

use laurel_engine::Orchestrator;
use laurel_store::{Database, StoreBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,laurel_server=debug,laurel_engine=debug")
            }),
        )
        .init();

    info!("Starting Laurel badge server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        instance = %config.instance_name,
        http_addr = %config.http_addr,
        admin_enabled = config.admin_token.is_some(),
        evaluate_hidden = config.evaluate_hidden_badges,
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open the database and wire the engine
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };

    let store = StoreBackend::new(db).include_hidden(config.evaluate_hidden_badges);
    let shared = Arc::new(store.clone());
    let engine = Orchestrator::new(shared.clone(), shared.clone(), shared);
    info!(
        evaluators = engine.registry().len(),
        "Badge engine ready"
    );

    let http_addr = config.http_addr;
    let app_state = AppState {
        store,
        engine: Arc::new(engine),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
