//! Reading artifacts from disk.
//!
//! Steps:
//! 1. Read both files in parallel (rayon::join)
//! 2. Deserialize them into their `*Spec` shapes
//! 3. Convert to checked runtime types (shape checks run here)
//! 4. Cross-check classifier classes against the encoder

use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{ArtifactLoadError, Result};
use crate::shape;
use crate::types::{ArtifactBundle, Classifier, ClassifierSpec, LabelEncoder, LabelEncoderSpec};

/// Default file name of the classifier artifact
pub const DEFAULT_CLASSIFIER_FILE: &str = "crop_model.json";

/// Default file name of the label encoder artifact
pub const DEFAULT_ENCODER_FILE: &str = "label_encoder.json";

/// Directory the artifacts are read from by default, relative to the
/// working directory
pub const DEFAULT_ARTIFACT_DIR: &str = "models";

/// `DEFAULT_CLASSIFIER_FILE` inside `DEFAULT_ARTIFACT_DIR`
pub const DEFAULT_CLASSIFIER_PATH: &str = "models/crop_model.json";

/// `DEFAULT_ENCODER_FILE` inside `DEFAULT_ARTIFACT_DIR`
pub const DEFAULT_ENCODER_PATH: &str = "models/label_encoder.json";

/// Width of a soil/weather sample: N, P, K, temperature, humidity, pH, rainfall
pub const DEFAULT_FEATURE_COUNT: usize = 7;

/// Where the artifacts live and what shape the classifier must have
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub classifier: PathBuf,
    pub encoder: PathBuf,
    pub expected_features: usize,
}

impl ArtifactPaths {
    pub fn new(classifier: impl Into<PathBuf>, encoder: impl Into<PathBuf>) -> Self {
        Self {
            classifier: classifier.into(),
            encoder: encoder.into(),
            expected_features: DEFAULT_FEATURE_COUNT,
        }
    }

    /// Both default file names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_CLASSIFIER_FILE), dir.join(DEFAULT_ENCODER_FILE))
    }

    pub fn with_expected_features(mut self, expected_features: usize) -> Self {
        self.expected_features = expected_features;
        self
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new(DEFAULT_CLASSIFIER_PATH, DEFAULT_ENCODER_PATH)
    }
}

/// Load and check both artifacts.
///
/// Any failure is an `ArtifactLoadError`; there is no partial result.
pub fn load(paths: &ArtifactPaths) -> Result<ArtifactBundle> {
    let start = Instant::now();
    info!(
        "Loading artifacts: classifier={}, encoder={}",
        paths.classifier.display(),
        paths.encoder.display()
    );

    let (classifier, encoder) = rayon::join(
        || load_classifier(&paths.classifier),
        || load_encoder(&paths.encoder),
    );
    let classifier = classifier?;
    let encoder = encoder?;

    shape::check_feature_count(&classifier, paths.expected_features)?;
    let bundle = ArtifactBundle::new(classifier, encoder)?;

    info!(
        "Loaded {} with {} trees and {} labels in {:.2?}",
        bundle.classifier().kind(),
        bundle.classifier().trees().len(),
        bundle.encoder().len(),
        start.elapsed()
    );
    Ok(bundle)
}

/// Load the classifier file on its own
pub fn load_classifier(path: &Path) -> Result<Classifier> {
    let spec: ClassifierSpec = read_json(path)?;
    debug!(
        "Parsed classifier spec: kind={:?}, n_features={}, trees={}",
        spec.kind,
        spec.n_features,
        spec.trees.len()
    );
    Classifier::try_from(spec)
}

/// Load the label encoder file on its own
pub fn load_encoder(path: &Path) -> Result<LabelEncoder> {
    let spec: LabelEncoderSpec = read_json(path)?;
    debug!("Parsed label encoder spec: {} classes", spec.classes.len());
    LabelEncoder::try_from(spec)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let display = path.display().to_string();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ArtifactLoadError::FileNotFound {
            path: display.clone(),
        },
        _ => ArtifactLoadError::Io {
            path: display.clone(),
            source: e,
        },
    })?;

    serde_json::from_slice(&bytes).map_err(|source| ArtifactLoadError::Malformed {
        path: display,
        source,
    })
}
