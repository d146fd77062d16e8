//! # Recommendation Orchestrator
//!
//! This module coordinates one request end to end:
//! 1. Load the artifacts once, at startup (blocking thread, before binding)
//! 2. Validate the submitted fields
//! 3. Predict and decode the crop
//! 4. Look up the optional crop image
//! 5. Return everything the page or the JSON API needs
//!
//! Handlers share one orchestrator behind an `Arc`; the model inside is
//! read-only, so requests never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use artifact_loader::{ArtifactBundle, ArtifactCache, ClassifierKind};
use pipeline::{
    Field, ImageCatalog, ImagePreview, RecommendError, Recommender, SoilWeatherSample,
};

use crate::config::ServerConfig;

/// Final recommendation returned to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropRecommendation {
    pub crop: String,
    pub headline: String,
    pub explanation: String,
    pub preview: ImagePreview,
    pub sample: SoilWeatherSample,
}

/// Main orchestrator that coordinates the recommendation pipeline
#[derive(Debug, Clone)]
pub struct RecommendationOrchestrator {
    recommender: Recommender,
    images: ImageCatalog,
}

impl RecommendationOrchestrator {
    /// Load the artifacts named in `config` and build the orchestrator
    ///
    /// Loading runs on a blocking thread. Any load failure is returned and
    /// the caller is expected to stop; nothing is served without a model.
    pub async fn new(config: &ServerConfig) -> Result<Self> {
        let start_time = Instant::now();
        let paths = config.artifacts.clone();

        let artifacts = tokio::task::spawn_blocking(move || artifact_loader::load(&paths))
            .await
            .context("Artifact loading task failed")?
            .context("Failed to load model artifacts")?;

        info!(
            "Loaded {} with {} crops in {:.2?}",
            artifacts.classifier().kind(),
            artifacts.encoder().len(),
            start_time.elapsed()
        );

        Ok(Self::from_artifacts(
            Arc::new(artifacts),
            ImageCatalog::new(config.image_dir.clone()),
        ))
    }

    /// Build over a shared cache, loading through it if nobody has yet
    ///
    /// Every orchestrator built from the same cache shares one model.
    /// Blocks while the first load runs.
    pub fn from_cache(cache: &ArtifactCache, images: ImageCatalog) -> Result<Self> {
        let artifacts = cache.get_or_load().with_context(|| {
            format!(
                "Failed to load model artifacts from {} and {}",
                cache.paths().classifier.display(),
                cache.paths().encoder.display()
            )
        })?;
        Ok(Self::from_artifacts(artifacts, images))
    }

    /// Build from artifacts that are already loaded
    pub fn from_artifacts(artifacts: Arc<ArtifactBundle>, images: ImageCatalog) -> Self {
        Self {
            recommender: Recommender::new(artifacts),
            images,
        }
    }

    pub fn images(&self) -> &ImageCatalog {
        &self.images
    }

    pub fn labels(&self) -> &[String] {
        self.recommender.labels()
    }

    pub fn classifier_kind(&self) -> ClassifierKind {
        self.recommender.artifacts().classifier().kind()
    }

    /// Main entry point: recommend a crop for a complete sample
    pub fn recommend(&self, sample: SoilWeatherSample) -> Result<CropRecommendation, RecommendError> {
        let start_time = Instant::now();

        let result = self.recommender.recommend(sample).map_err(|err| {
            if err.is_validation() {
                info!("Rejected input: {}", err);
            } else {
                warn!("Recommendation failed: {}", err);
            }
            err
        })?;

        let preview = self.images.lookup(&result.crop);
        if !preview.is_available() {
            info!("No image for {}", result.crop);
        }

        info!(
            "Recommended {} in {:.2?}",
            result.crop,
            start_time.elapsed()
        );

        Ok(CropRecommendation {
            headline: result.headline(),
            explanation: result.explanation(),
            crop: result.crop,
            preview,
            sample: result.sample,
        })
    }

    /// Recommend from raw form fields keyed by `Field::key`
    pub fn recommend_form(
        &self,
        form: &HashMap<String, String>,
    ) -> Result<CropRecommendation, RecommendError> {
        let sample =
            SoilWeatherSample::parse_text(|field: Field| form.get(field.key()).map(String::as_str))?;
        self.recommend(sample)
    }
}
