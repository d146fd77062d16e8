//! Core artifact types: the tree-ensemble classifier and the label encoder.
//!
//! Both come in two flavours:
//! - a `*Spec` struct that mirrors the JSON file one-to-one (serde derive)
//! - the checked runtime type, built from the spec with `TryFrom`
//!
//! Only the checked types are handed to the rest of the system, so inference
//! code never has to re-validate node indices or class tables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{ArtifactLoadError, InferenceError};
use crate::shape;

// =============================================================================
// Type Aliases
// =============================================================================

/// Class index produced by the classifier and decoded by the label encoder
pub type ClassIndex = u32;

/// Marker used in `children_left`/`children_right` for "no child"
pub const TREE_LEAF: i64 = -1;

// =============================================================================
// Serialized Shapes
// =============================================================================

/// Which estimator the classifier file describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    DecisionTree,
    RandomForest,
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierKind::DecisionTree => write!(f, "decision tree"),
            ClassifierKind::RandomForest => write!(f, "random forest"),
        }
    }
}

/// One CART tree in flat node-array layout.
///
/// Node `i` is a leaf when `children_left[i] == -1`. Otherwise samples with
/// `x[feature[i]] <= threshold[i]` go to `children_left[i]`, the rest to
/// `children_right[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSpec {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights, one column per entry of `ClassifierSpec::classes`
    pub value: Vec<Vec<f64>>,
}

/// Classifier file as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSpec {
    pub kind: ClassifierKind,
    pub n_features: usize,
    /// Maps output column to class index; defaults to `0..n_columns`
    #[serde(default)]
    pub classes: Option<Vec<ClassIndex>>,
    pub trees: Vec<TreeSpec>,
}

/// Label encoder file as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoderSpec {
    pub classes: Vec<String>,
}

// =============================================================================
// Checked Runtime Types
// =============================================================================

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Normalized class distribution of the training samples in this leaf
    Leaf { proba: Vec<f64> },
}

/// A validated decision tree
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Walk from the root to a leaf and return its class distribution
    fn leaf_proba(&self, x: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { proba } => return proba,
            }
        }
    }

    /// Number of nodes (splits and leaves)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Length of the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        fn depth_at(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + depth_at(nodes, *left).max(depth_at(nodes, *right))
                }
            }
        }
        depth_at(&self.nodes, 0)
    }

    /// Build from a spec that already passed `shape::check_classifier`
    fn from_checked(spec: TreeSpec) -> Self {
        let nodes = (0..spec.children_left.len())
            .map(|i| {
                if spec.children_left[i] == TREE_LEAF {
                    let row = &spec.value[i];
                    let total: f64 = row.iter().sum();
                    Node::Leaf {
                        proba: row.iter().map(|w| w / total).collect(),
                    }
                } else {
                    Node::Split {
                        feature: spec.feature[i] as usize,
                        threshold: spec.threshold[i],
                        left: spec.children_left[i] as usize,
                        right: spec.children_right[i] as usize,
                    }
                }
            })
            .collect();

        Self { nodes }
    }
}

/// Pre-trained tree-ensemble classifier.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Classifier {
    kind: ClassifierKind,
    n_features: usize,
    classes: Vec<ClassIndex>,
    trees: Vec<DecisionTree>,
}

impl Classifier {
    pub fn kind(&self) -> ClassifierKind {
        self.kind
    }

    /// Length of the feature vector `predict_one` expects
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Class indices this classifier can emit, in output-column order
    pub fn classes(&self) -> &[ClassIndex] {
        &self.classes
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Average class distribution over all trees (soft voting)
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if x.len() != self.n_features {
            return Err(InferenceError::DimensionMismatch {
                expected: self.n_features,
                found: x.len(),
            });
        }
        if let Some(position) = x.iter().position(|v| !v.is_finite()) {
            return Err(InferenceError::NonFinite { position });
        }

        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.leaf_proba(x)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        Ok(proba)
    }

    /// Predict the class index for a single sample
    ///
    /// Ties go to the lowest output column.
    pub fn predict_one(&self, x: &[f64]) -> Result<ClassIndex, InferenceError> {
        let proba = self.predict_proba(x)?;
        let mut best = 0;
        for (column, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = column;
            }
        }
        Ok(self.classes[best])
    }
}

impl TryFrom<ClassifierSpec> for Classifier {
    type Error = ArtifactLoadError;

    fn try_from(spec: ClassifierSpec) -> Result<Self, Self::Error> {
        let n_columns = spec
            .trees
            .first()
            .and_then(|t| t.value.first())
            .map(Vec::len)
            .unwrap_or(0);
        let classes = spec
            .classes
            .clone()
            .unwrap_or_else(|| (0..n_columns as ClassIndex).collect());

        shape::check_classifier(&spec, &classes)?;

        let trees = spec.trees.into_iter().map(DecisionTree::from_checked).collect();

        Ok(Self {
            kind: spec.kind,
            n_features: spec.n_features,
            classes,
            trees,
        })
    }
}

/// Bidirectional mapping between class indices and crop names
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    labels: Vec<String>,
    index: HashMap<String, ClassIndex>,
}

impl LabelEncoder {
    /// Decode a class index to its label
    pub fn label_for(&self, index: ClassIndex) -> Option<&str> {
        self.labels.get(index as usize).map(String::as_str)
    }

    /// Encode a label back to its class index
    pub fn index_of(&self, label: &str) -> Option<ClassIndex> {
        self.index.get(label).copied()
    }

    /// All labels, ordered by class index
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }
}

impl TryFrom<LabelEncoderSpec> for LabelEncoder {
    type Error = ArtifactLoadError;

    fn try_from(spec: LabelEncoderSpec) -> Result<Self, Self::Error> {
        shape::check_labels(&spec.classes)?;

        let index = spec
            .classes
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i as ClassIndex))
            .collect();

        Ok(Self {
            labels: spec.classes,
            index,
        })
    }
}

// =============================================================================
// ArtifactBundle - Everything the Pipeline Needs
// =============================================================================

/// The classifier and label encoder loaded together.
///
/// Building a bundle checks that every class the classifier can emit has a
/// label, so holders of a bundle can rely on that invariant.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    classifier: Classifier,
    encoder: LabelEncoder,
}

impl ArtifactBundle {
    pub fn new(classifier: Classifier, encoder: LabelEncoder) -> Result<Self, ArtifactLoadError> {
        shape::check_coverage(&classifier, &encoder)?;
        Ok(Self {
            classifier,
            encoder,
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }
}
