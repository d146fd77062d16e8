//! Core traits for the recommendation pipeline.
//!
//! This module defines the Predictor trait, the seam between the pipeline
//! and whatever model produces class indices.

use artifact_loader::{ClassIndex, Classifier};

use crate::recommend::PredictionError;
use crate::sample::FEATURE_COUNT;

/// A model that maps one feature vector to a class index.
///
/// ## Design Note
/// - `Send + Sync` allows one loaded model to serve concurrent requests
/// - `predict` takes `&self`: inference never mutates the model
/// - The input is already validated and in `FEATURE_ORDER`
pub trait Predictor: Send + Sync {
    /// Returns the name of this model (for logging/debugging)
    fn name(&self) -> &str;

    /// Predict the class index for a single sample
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<ClassIndex, PredictionError>;
}

impl Predictor for Classifier {
    fn name(&self) -> &str {
        match self.kind() {
            artifact_loader::ClassifierKind::DecisionTree => "DecisionTree",
            artifact_loader::ClassifierKind::RandomForest => "RandomForest",
        }
    }

    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<ClassIndex, PredictionError> {
        Ok(self.predict_one(features)?)
    }
}
