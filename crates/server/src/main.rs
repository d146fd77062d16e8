//! Standalone server binary.
//!
//! Reads its settings from the `CROP_*` environment variables; the
//! `crop-recs` CLI offers the same server with flags.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        "Starting crop recommendation server (model: {}, encoder: {}, images: {})",
        config.artifacts.classifier.display(),
        config.artifacts.encoder.display(),
        config.image_dir.display()
    );

    server::serve(config).await
}
