//! Server configuration.
//!
//! Every setting has a default and can be overridden from the environment.
//! The CLI maps the same variables onto flags. Default paths are relative to
//! the working directory and match the repository layout (`models/`).

use anyhow::{Context, Result};
use artifact_loader::{ArtifactPaths, DEFAULT_CLASSIFIER_PATH, DEFAULT_ENCODER_PATH};
use pipeline::{DEFAULT_IMAGE_DIR, FEATURE_COUNT};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const ENV_MODEL_PATH: &str = "CROP_MODEL_PATH";
pub const ENV_ENCODER_PATH: &str = "CROP_ENCODER_PATH";
pub const ENV_IMAGE_DIR: &str = "CROP_IMAGE_DIR";
pub const ENV_BIND_ADDR: &str = "CROP_BIND_ADDR";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub artifacts: ArtifactPaths,
    pub image_dir: PathBuf,
}

impl ServerConfig {
    pub fn new(
        bind_addr: SocketAddr,
        model_path: impl Into<PathBuf>,
        encoder_path: impl Into<PathBuf>,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bind_addr,
            artifacts: ArtifactPaths::new(model_path, encoder_path)
                .with_expected_features(FEATURE_COUNT),
            image_dir: image_dir.into(),
        }
    }

    /// Defaults overridden by whichever `CROP_*` variables are set
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .with_context(|| format!("{} is not a socket address: {}", ENV_BIND_ADDR, bind))?;

        Ok(Self::new(
            bind_addr,
            lookup(ENV_MODEL_PATH).unwrap_or_else(|| DEFAULT_CLASSIFIER_PATH.to_string()),
            lookup(ENV_ENCODER_PATH).unwrap_or_else(|| DEFAULT_ENCODER_PATH.to_string()),
            lookup(ENV_IMAGE_DIR).unwrap_or_else(|| DEFAULT_IMAGE_DIR.to_string()),
        ))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(
            ([127, 0, 0, 1], 8501).into(),
            DEFAULT_CLASSIFIER_PATH,
            DEFAULT_ENCODER_PATH,
            DEFAULT_IMAGE_DIR,
        )
    }
}
