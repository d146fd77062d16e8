//! The recommendation pipeline: validate → predict → decode.
//!
//! `recommend` is a pure function of its inputs and the shared, read-only
//! model. It never retries; every failure is reported straight back.

use std::sync::Arc;
use std::time::Instant;

use artifact_loader::{ArtifactBundle, ClassIndex, InferenceError, LabelEncoder};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::sample::{Field, SoilWeatherSample, FEATURE_ORDER};
use crate::traits::Predictor;
use crate::validation::ValidationError;

/// The classifier failed while running inference
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("classifier rejected the input: {0}")]
    Inference(#[from] InferenceError),

    #[error("classifier failed: {0}")]
    Backend(String),
}

/// The classifier produced an index the label encoder cannot decode
///
/// Loading already checks this cannot happen with a consistent artifact
/// pair, so seeing it means the artifacts on disk do not belong together.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("classifier produced class {index} but the label encoder only knows {labels} crops")]
pub struct UnknownClassError {
    pub index: ClassIndex,
    pub labels: usize,
}

/// Every way a single recommendation can fail
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecommendError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Error making prediction: {0}")]
    Prediction(#[from] PredictionError),

    #[error("Error making prediction: {0}")]
    UnknownClass(#[from] UnknownClassError),
}

impl RecommendError {
    /// Message shown to the person who submitted the form
    pub fn user_message(&self) -> String {
        match self {
            RecommendError::Validation(err) => {
                let details: Vec<String> = err.violations.iter().map(ToString::to_string).collect();
                format!("Please check your inputs: {}", details.join("; "))
            }
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RecommendError::Validation(_))
    }
}

/// Outcome of one successful request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResult {
    pub crop: String,
    pub class_index: ClassIndex,
    pub sample: SoilWeatherSample,
}

impl RecommendationResult {
    /// Crop name as a headline, e.g. "RICE"
    pub fn headline(&self) -> String {
        self.crop.to_uppercase()
    }

    /// "About this recommendation": the conditions it was based on
    pub fn explanation(&self) -> String {
        let mut lines = vec!["This recommendation is based on the following conditions:".to_string()];
        for field in Field::FORM_ORDER {
            let value = self.sample.get(field);
            let line = match field.unit() {
                "" => format!("- {}: {}", field.label(), value),
                "°C" | "%" => format!("- {}: {}{}", field.label(), value, field.unit()),
                unit => format!("- {}: {} {}", field.label(), value, unit),
            };
            lines.push(line);
        }
        lines.push(format!(
            "The model predicts that {} would be the most suitable crop for these conditions.",
            self.crop
        ));
        lines.join("\n")
    }
}

/// Validate the sample, run the classifier and decode its answer.
///
/// # Errors
/// - `Validation` if any field is non-finite or out of bounds; the
///   classifier is not called
/// - `Prediction` if the classifier fails
/// - `UnknownClass` if the class index has no label
pub fn recommend<P>(
    sample: SoilWeatherSample,
    classifier: &P,
    encoder: &LabelEncoder,
) -> Result<RecommendationResult, RecommendError>
where
    P: Predictor + ?Sized,
{
    sample.validate()?;

    let features = sample.to_features();
    debug!(
        "Predicting with {} on [{}]",
        classifier.name(),
        FEATURE_ORDER
            .iter()
            .zip(features.iter())
            .map(|(field, value)| format!("{}={}", field.key(), value))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let class_index = classifier.predict(&features).map_err(|e| {
        warn!("Prediction failed in {}: {}", classifier.name(), e);
        e
    })?;

    let crop = encoder.label_for(class_index).ok_or_else(|| {
        warn!("Class index {} missing from label encoder", class_index);
        UnknownClassError {
            index: class_index,
            labels: encoder.len(),
        }
    })?;

    Ok(RecommendationResult {
        crop: crop.to_string(),
        class_index,
        sample,
    })
}

/// Shared handle over a loaded artifact bundle
///
/// Cheap to clone; every clone reads the same model.
#[derive(Debug, Clone)]
pub struct Recommender {
    artifacts: Arc<ArtifactBundle>,
}

impl Recommender {
    pub fn new(artifacts: Arc<ArtifactBundle>) -> Self {
        Self { artifacts }
    }

    pub fn artifacts(&self) -> &ArtifactBundle {
        &self.artifacts
    }

    /// All crop names the model can recommend
    pub fn labels(&self) -> &[String] {
        self.artifacts.encoder().labels()
    }

    pub fn recommend(&self, sample: SoilWeatherSample) -> Result<RecommendationResult, RecommendError> {
        let start = Instant::now();
        let result = recommend(sample, self.artifacts.classifier(), self.artifacts.encoder());
        debug!("Recommendation finished in {:.2?}", start.elapsed());
        result
    }
}
