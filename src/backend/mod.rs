//! Model backend capability: the narrow train/predict contract the
//! pipeline consumes.
//!
//! Each backend owns its hyperparameters and internal algorithm; the
//! pipeline sees only [`ModelBackend`] and treats every variant uniformly.
//! Variants are selected through [`BackendKind`], a registry rather than
//! ad-hoc branching at call sites.

use crate::error::{DetectarError, Result};
use crate::primitives::Matrix;
use crate::tree::{GradientBoostingClassifier, LeafWiseBoostingClassifier, RandomForestClassifier};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A backend's output for one test set: hard labels or class-1
/// probabilities, index-aligned with `y_test`.
///
/// Produced once per backend run and consumed immediately by the
/// thresholder/evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// Hard 0/1 class labels.
    Labels(Vec<usize>),
    /// Class-1 probabilities in [0, 1]; must be thresholded before scoring.
    Probabilities(Vec<f32>),
}

impl Prediction {
    /// Number of predicted samples.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Prediction::Labels(v) => v.len(),
            Prediction::Probabilities(v) => v.len(),
        }
    }

    /// Returns true if no samples were predicted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The capability set every model backend exposes: train on (X, y),
/// predict for X.
pub trait ModelBackend {
    /// Stable backend name used to key results.
    fn name(&self) -> &str;

    /// Trains on the given features and 0/1 labels.
    ///
    /// # Errors
    ///
    /// Returns an error if training fails (empty data, length mismatch,
    /// degenerate input).
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()>;

    /// Predicts for the given features.
    ///
    /// # Errors
    ///
    /// Returns an error if called before a successful `fit`.
    fn predict(&self, x: &Matrix<f32>) -> Result<Prediction>;
}

/// The registered backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Depth-wise gradient-boosted trees; predicts hard labels.
    #[serde(rename = "gbt")]
    GradientBoosted,
    /// Leaf-wise boosted trees; predicts class-1 probabilities.
    #[serde(rename = "lgbm")]
    LeafWiseBoosted,
    /// Bootstrap-aggregated decision trees; predicts hard labels.
    RandomForest,
}

impl BackendKind {
    /// All registered kinds, in report order.
    pub const ALL: [BackendKind; 3] = [
        BackendKind::GradientBoosted,
        BackendKind::LeafWiseBoosted,
        BackendKind::RandomForest,
    ];

    /// Instantiates a backend of this kind with its default
    /// hyperparameters, seeded for reproducible runs.
    #[must_use]
    pub fn create(self, random_state: u64) -> Box<dyn ModelBackend> {
        match self {
            BackendKind::GradientBoosted => Box::new(GradientBoostingClassifier::new()),
            BackendKind::LeafWiseBoosted => Box::new(
                LeafWiseBoostingClassifier::new()
                    .with_num_leaves(31)
                    .with_max_depth(7)
                    .with_learning_rate(0.01),
            ),
            BackendKind::RandomForest => {
                Box::new(RandomForestClassifier::new(25).with_random_state(random_state))
            }
        }
    }

    /// The name used to key this backend's results.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::GradientBoosted => "gbt",
            BackendKind::LeafWiseBoosted => "lgbm",
            BackendKind::RandomForest => "random_forest",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = DetectarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gbt" => Ok(BackendKind::GradientBoosted),
            "lgbm" => Ok(BackendKind::LeafWiseBoosted),
            "random_forest" => Ok(BackendKind::RandomForest),
            other => Err(DetectarError::InvalidHyperparameter {
                param: "backend".to_string(),
                value: other.to_string(),
                constraint: "one of gbt, lgbm, random_forest".to_string(),
            }),
        }
    }
}
