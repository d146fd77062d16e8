//! Recommendation pipeline for soil/weather samples.
//!
//! This crate provides:
//! - `SoilWeatherSample` and the field bounds it is validated against
//! - Validation with per-field violations
//! - The `Predictor` trait, implemented for the loaded classifier
//! - `recommend`, which turns one sample into one crop name
//! - `ImageCatalog` for the optional crop image
//!
//! ## Architecture
//! A request goes through three stages:
//! 1. Validate every field (nothing invalid reaches the model)
//! 2. Build the feature vector in `FEATURE_ORDER` and predict a class index
//! 3. Decode the index with the label encoder
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{recommend, SoilWeatherSample};
//!
//! let bundle = artifact_loader::load(&Default::default())?;
//! let sample = SoilWeatherSample::default();
//! let result = recommend(sample, bundle.classifier(), bundle.encoder())?;
//! println!("Recommended crop: {}", result.headline());
//! ```

pub mod preview;
pub mod recommend;
pub mod sample;
pub mod traits;
pub mod validation;

// Re-export main types
pub use preview::{ImageCatalog, ImagePreview, DEFAULT_IMAGE_DIR, IMAGE_EXTENSION};
pub use recommend::{
    recommend, PredictionError, RecommendError, RecommendationResult, Recommender,
    UnknownClassError,
};
pub use sample::{Field, FieldBounds, SampleInput, SoilWeatherSample, FEATURE_COUNT, FEATURE_ORDER};
pub use traits::Predictor;
pub use validation::{FieldViolation, ValidationError, ViolationKind};
