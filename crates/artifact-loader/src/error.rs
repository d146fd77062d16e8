//! Error types for the artifact-loader crate.
//!
//! Every failure here is fatal for the process: without a classifier and a
//! label encoder there is nothing to serve.

use thiserror::Error;

/// Errors that can occur while loading the classifier or the label encoder
///
/// The `#[derive(Error)]` macro from thiserror implements `std::error::Error`
/// and `Display` from the `#[error(...)]` attributes.
#[derive(Error, Debug)]
pub enum ArtifactLoadError {
    /// Artifact file does not exist
    #[error("Artifact not found: {path}")]
    FileNotFound { path: String },

    /// File exists but could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File content is not valid JSON for the expected artifact
    #[error("Failed to deserialize {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Artifact deserialized, but its shape is not usable
    ///
    /// This variant stores which artifact failed and why, e.g. a tree whose
    /// child index points outside the node array.
    #[error("Invalid {artifact}: {reason}")]
    InvalidShape {
        artifact: &'static str,
        reason: String,
    },

    /// Classifier can emit a class the label encoder cannot decode
    #[error("Classifier emits class index {index} but label encoder only has {labels} labels")]
    EncoderMismatch { index: u32, labels: usize },
}

impl ArtifactLoadError {
    pub(crate) fn classifier(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            artifact: "classifier",
            reason: reason.into(),
        }
    }

    pub(crate) fn encoder(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            artifact: "label encoder",
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ArtifactLoadError>;

/// Errors raised by a loaded classifier during inference
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Expected {expected} features but got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Feature at position {position} is not a finite number")]
    NonFinite { position: usize },
}
