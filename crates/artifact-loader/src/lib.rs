//! # Artifact Loader Crate
//!
//! This crate loads the two pre-built artifacts the recommender runs on:
//! a tree-ensemble classifier and the label encoder that turns its class
//! indices back into crop names.
//!
//! ## Main Components
//!
//! - **types**: Serialized shapes (`*Spec`) and checked runtime types
//! - **shape**: Post-load checks that reject unusable artifacts
//! - **loader**: Read both files from disk (in parallel) into an `ArtifactBundle`
//! - **cache**: Load-once, process-wide access to the bundle
//! - **error**: Error types for loading and inference
//!
//! ## Example Usage
//!
//! ```ignore
//! use artifact_loader::{ArtifactCache, ArtifactPaths};
//!
//! let cache = ArtifactCache::new(ArtifactPaths::default());
//! let bundle = cache.get_or_load()?;
//!
//! let class = bundle.classifier().predict_one(&[90.0, 42.0, 43.0, 20.9, 82.0, 6.5, 202.9])?;
//! println!("{:?}", bundle.encoder().label_for(class));
//! ```
//!
//! Every error from this crate is fatal for a serving process: there is no
//! degraded mode without a model.

pub mod cache;
pub mod error;
pub mod loader;
mod shape;
pub mod types;

// Re-export commonly used types for convenience
pub use cache::ArtifactCache;
pub use error::{ArtifactLoadError, InferenceError, Result};
pub use loader::{
    load, load_classifier, load_encoder, ArtifactPaths, DEFAULT_ARTIFACT_DIR,
    DEFAULT_CLASSIFIER_FILE, DEFAULT_CLASSIFIER_PATH, DEFAULT_ENCODER_FILE, DEFAULT_ENCODER_PATH,
    DEFAULT_FEATURE_COUNT,
};
pub use types::{
    ArtifactBundle, ClassIndex, Classifier, ClassifierKind, ClassifierSpec, DecisionTree,
    LabelEncoder, LabelEncoderSpec, TreeSpec,
};


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{stump_classifier_json, ENCODER_JSON};

    fn stump_classifier() -> Classifier {
        let spec: ClassifierSpec = serde_json::from_str(&stump_classifier_json(7)).unwrap();
        Classifier::try_from(spec).unwrap()
    }

    fn encoder() -> LabelEncoder {
        let spec: LabelEncoderSpec = serde_json::from_str(ENCODER_JSON).unwrap();
        LabelEncoder::try_from(spec).unwrap()
    }

    fn tree(value: Vec<Vec<f64>>) -> TreeSpec {
        TreeSpec {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![0.5, -2.0, -2.0],
            value,
        }
    }

    fn forest(trees: Vec<TreeSpec>) -> ClassifierSpec {
        ClassifierSpec {
            kind: ClassifierKind::RandomForest,
            n_features: 7,
            classes: None,
            trees,
        }
    }

    #[test]
    fn test_soft_voting() {
        let classifier = stump_classifier();
        // N=90 goes right in tree 0 -> [0, .4, .6]; temperature 20.9 goes left in tree 1 -> [0, .2, .8]
        let x = [90.0, 42.0, 43.0, 20.9, 82.0, 6.5, 202.9];

        let proba = classifier.predict_proba(&x).unwrap();
        assert!((proba[0] - 0.0).abs() < 1e-9);
        assert!((proba[1] - 0.3).abs() < 1e-9);
        assert!((proba[2] - 0.7).abs() < 1e-9);
        assert_eq!(classifier.predict_one(&x).unwrap(), 2);
    }

    #[test]
    fn test_threshold_is_inclusive_on_the_left() {
        let classifier = stump_classifier();
        // N=60 and temperature=25 both sit exactly on the thresholds
        let x = [60.0, 0.0, 0.0, 25.0, 0.0, 0.0, 0.0];
        // tree 0 left [.8, .2, 0], tree 1 left [0, .2, .8] -> tie between 0 and 2
        assert_eq!(classifier.predict_one(&x).unwrap(), 0, "ties go to the lowest column");
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let classifier = stump_classifier();
        let err = classifier.predict_one(&[1.0, 2.0]).unwrap_err();
        assert_eq!(err, InferenceError::DimensionMismatch { expected: 7, found: 2 });
    }

    #[test]
    fn test_predict_rejects_nan() {
        let classifier = stump_classifier();
        let x = [1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(
            classifier.predict_one(&x).unwrap_err(),
            InferenceError::NonFinite { position: 2 }
        );
    }

    #[test]
    fn test_explicit_class_table() {
        let mut spec = forest(vec![tree(vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]])]);
        spec.classes = Some(vec![5, 9]);
        let classifier = Classifier::try_from(spec).unwrap();

        assert_eq!(classifier.predict_one(&[0.0; 7]).unwrap(), 5);
        assert_eq!(classifier.predict_one(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap(), 9);
    }

    #[test]
    fn test_tree_depth_and_size() {
        let classifier = stump_classifier();
        assert_eq!(classifier.trees().len(), 2);
        assert_eq!(classifier.trees()[0].depth(), 1);
        assert_eq!(classifier.trees()[0].node_count(), 3);
    }

    #[test]
    fn test_label_encoder_lookups() {
        let encoder = encoder();
        assert_eq!(encoder.label_for(2), Some("rice"));
        assert_eq!(encoder.index_of("maize"), Some(0));
        assert_eq!(encoder.label_for(3), None);
        assert_eq!(encoder.index_of("wheat"), None);
        assert!(encoder.contains("mango"));
    }

    #[test]
    fn test_rejects_cyclic_tree() {
        let mut bad = tree(vec![vec![1.0], vec![1.0], vec![1.0]]);
        bad.children_left = vec![1, 0, -1];
        bad.children_right = vec![2, 2, -1];
        let err = Classifier::try_from(forest(vec![bad])).unwrap_err();
        assert!(err.to_string().contains("invalid child"));
    }

    #[test]
    fn test_rejects_unknown_feature() {
        let mut bad = tree(vec![vec![1.0], vec![1.0], vec![1.0]]);
        bad.feature[0] = 7;
        let err = Classifier::try_from(forest(vec![bad])).unwrap_err();
        assert!(err.to_string().contains("feature 7"));
    }

    #[test]
    fn test_rejects_ragged_arrays() {
        let mut bad = tree(vec![vec![1.0], vec![1.0], vec![1.0]]);
        bad.threshold.pop();
        assert!(Classifier::try_from(forest(vec![bad])).is_err());
    }

    #[test]
    fn test_rejects_half_leaf() {
        let mut bad = tree(vec![vec![1.0], vec![1.0], vec![1.0]]);
        bad.children_right[0] = -1;
        let err = Classifier::try_from(forest(vec![bad])).unwrap_err();
        assert!(err.to_string().contains("only one child"));
    }

    #[test]
    fn test_rejects_empty_leaf() {
        let bad = tree(vec![vec![1.0, 1.0], vec![0.0, 0.0], vec![0.0, 1.0]]);
        let err = Classifier::try_from(forest(vec![bad])).unwrap_err();
        assert!(err.to_string().contains("no class weight"));
    }

    #[test]
    fn test_rejects_mismatched_class_table() {
        let mut spec = forest(vec![tree(vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]])]);
        spec.classes = Some(vec![0, 1, 2]);
        assert!(Classifier::try_from(spec).is_err());
    }

    #[test]
    fn test_decision_tree_kind_needs_one_tree() {
        let value = vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let mut spec = forest(vec![tree(value.clone()), tree(value)]);
        spec.kind = ClassifierKind::DecisionTree;
        assert!(Classifier::try_from(spec).is_err());
    }

    #[test]
    fn test_no_trees() {
        assert!(Classifier::try_from(forest(vec![])).is_err());
    }

    #[test]
    fn test_rejects_bad_labels() {
        let duplicate = LabelEncoderSpec {
            classes: vec!["rice".into(), "rice".into()],
        };
        assert!(LabelEncoder::try_from(duplicate).is_err());

        let blank = LabelEncoderSpec {
            classes: vec!["rice".into(), "  ".into()],
        };
        assert!(LabelEncoder::try_from(blank).is_err());

        let empty = LabelEncoderSpec { classes: vec![] };
        assert!(LabelEncoder::try_from(empty).is_err());
    }

    #[test]
    fn test_bundle_checks_coverage() {
        let small = LabelEncoder::try_from(LabelEncoderSpec {
            classes: vec!["maize".into()],
        })
        .unwrap();
        let err = ArtifactBundle::new(stump_classifier(), small).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::EncoderMismatch { index: 1, labels: 1 }));

        assert!(ArtifactBundle::new(stump_classifier(), encoder()).is_ok());
    }
}
