//! # iv-server
//!
//! HTTP front end for InvML. `POST /api/optimize/` takes an inline dataset,
//! fits every requested predictor variant and returns the feature vectors
//! that best reproduce the requested target value.

pub mod api;
pub mod chart;
pub mod config;
pub mod error;
pub mod handlers;
pub mod request;
pub mod response;
pub mod service;
pub mod state;

pub use api::create_router;
pub use config::{ServerConfig, SplitSettings};
pub use error::{ApiError, ApiResult};
pub use request::{OptimizeRequest, SearchRequest};
pub use response::OptimizeResponse;
pub use state::AppState;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

/// Bind `config.addr` and serve until ctrl-c.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config.clone()));
    let started_at = state.started_at;
    let app = create_router(state);

    let listener = TcpListener::bind(config.addr).await?;
    info!(
        address = %config.addr,
        max_body_mb = config.max_body_bytes / 1024 / 1024,
        test_size = config.split.test_size,
        split_seed = config.split.seed,
        started_at = %started_at.to_rfc3339(),
        "InvML server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let uptime = chrono::Utc::now() - started_at;
    info!(uptime_secs = uptime.num_seconds(), "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Cannot listen for ctrl-c; shutting down"),
    }
}
