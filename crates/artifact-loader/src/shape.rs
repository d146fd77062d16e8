//! Post-load shape checks.
//!
//! serde only guarantees that the JSON has the right field names and types.
//! These checks make sure the numbers inside describe something inference
//! can walk without panicking: in-range child pointers, known features,
//! class tables that line up.

use std::collections::HashSet;

use crate::error::{ArtifactLoadError, Result};
use crate::types::{ClassIndex, Classifier, ClassifierKind, ClassifierSpec, LabelEncoder, TreeSpec, TREE_LEAF};

pub(crate) fn check_classifier(spec: &ClassifierSpec, classes: &[ClassIndex]) -> Result<()> {
    if spec.n_features == 0 {
        return Err(ArtifactLoadError::classifier("n_features must be positive"));
    }

    match (spec.kind, spec.trees.len()) {
        (_, 0) => return Err(ArtifactLoadError::classifier("no trees")),
        (ClassifierKind::DecisionTree, n) if n != 1 => {
            return Err(ArtifactLoadError::classifier(format!(
                "decision_tree must hold exactly one tree, found {}",
                n
            )));
        }
        _ => {}
    }

    if classes.is_empty() {
        return Err(ArtifactLoadError::classifier("empty class table"));
    }
    let mut seen = HashSet::new();
    for class in classes {
        if !seen.insert(*class) {
            return Err(ArtifactLoadError::classifier(format!(
                "class index {} listed twice",
                class
            )));
        }
    }

    for (tree_idx, tree) in spec.trees.iter().enumerate() {
        check_tree(tree, spec.n_features, classes.len()).map_err(|reason| {
            ArtifactLoadError::classifier(format!("tree {}: {}", tree_idx, reason))
        })?;
    }

    Ok(())
}

/// Validate one flat tree; returns the reason as a plain string so the
/// caller can prefix the tree number
pub(crate) fn check_tree(
    tree: &TreeSpec,
    n_features: usize,
    n_columns: usize,
) -> std::result::Result<(), String> {
    let n = tree.children_left.len();
    if n == 0 {
        return Err("no nodes".to_string());
    }
    let lengths = [
        tree.children_right.len(),
        tree.feature.len(),
        tree.threshold.len(),
        tree.value.len(),
    ];
    if lengths.iter().any(|&len| len != n) {
        return Err(format!(
            "node arrays differ in length (children_left={}, children_right={}, feature={}, threshold={}, value={})",
            n, lengths[0], lengths[1], lengths[2], lengths[3]
        ));
    }

    for i in 0..n {
        let row = &tree.value[i];
        if row.len() != n_columns {
            return Err(format!(
                "node {} has {} class weights, expected {}",
                i,
                row.len(),
                n_columns
            ));
        }
        if row.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(format!("node {} has a negative or non-finite class weight", i));
        }

        let (left, right) = (tree.children_left[i], tree.children_right[i]);
        if left == TREE_LEAF || right == TREE_LEAF {
            if left != right {
                return Err(format!("node {} has only one child", i));
            }
            if row.iter().sum::<f64>() <= 0.0 {
                return Err(format!("leaf {} has no class weight", i));
            }
            continue;
        }

        // Children must point strictly forward, which also rules out cycles
        for child in [left, right] {
            if child <= i as i64 || child >= n as i64 {
                return Err(format!("node {} points to invalid child {}", i, child));
            }
        }
        let feature = tree.feature[i];
        if feature < 0 || feature as usize >= n_features {
            return Err(format!(
                "node {} splits on feature {} but the model has {} features",
                i, feature, n_features
            ));
        }
        if !tree.threshold[i].is_finite() {
            return Err(format!("node {} has a non-finite threshold", i));
        }
    }

    Ok(())
}

pub(crate) fn check_labels(labels: &[String]) -> Result<()> {
    if labels.is_empty() {
        return Err(ArtifactLoadError::encoder("no classes"));
    }
    let mut seen = HashSet::new();
    for (idx, label) in labels.iter().enumerate() {
        if label.trim().is_empty() {
            return Err(ArtifactLoadError::encoder(format!("class {} has a blank label", idx)));
        }
        if !seen.insert(label.as_str()) {
            return Err(ArtifactLoadError::encoder(format!("label '{}' listed twice", label)));
        }
    }
    Ok(())
}

/// Every class the classifier can emit must decode to a label
pub(crate) fn check_coverage(classifier: &Classifier, encoder: &LabelEncoder) -> Result<()> {
    match classifier
        .classes()
        .iter()
        .find(|&&class| encoder.label_for(class).is_none())
    {
        Some(&index) => Err(ArtifactLoadError::EncoderMismatch {
            index,
            labels: encoder.len(),
        }),
        None => Ok(()),
    }
}

pub(crate) fn check_feature_count(classifier: &Classifier, expected: usize) -> Result<()> {
    if classifier.n_features() != expected {
        return Err(ArtifactLoadError::classifier(format!(
            "expects {} features, the sample has {}",
            classifier.n_features(),
            expected
        )));
    }
    Ok(())
}
