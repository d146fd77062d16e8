//! Server crate for the crop recommendation service.
//!
//! This crate contains the orchestrator that runs a request through the
//! pipeline, the axum routes in front of it, and the HTML form page.

pub mod config;
pub mod orchestrator;
pub mod render;
pub mod routes;

pub use config::ServerConfig;
pub use orchestrator::{CropRecommendation, RecommendationOrchestrator};
pub use routes::{router, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Load the artifacts, then serve until Ctrl-C
///
/// The listener is only bound once the model has loaded, so a missing or
/// broken artifact stops the process before it accepts any input.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let orchestrator = RecommendationOrchestrator::new(&config).await?;
    serve_with(Arc::new(orchestrator), config.bind_addr).await
}

/// Serve an already built orchestrator
pub async fn serve_with(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Couldn't listen for Ctrl-C, serving until killed: {}", e);
            std::future::pending::<()>().await
        }
    }
}
