//! Depth-wise gradient boosting for binary classification.
//!
//! Each boosting round fits a shallow CART tree to the sign of the
//! log-loss pseudo-residuals and nudges the raw log-odds prediction by
//! `learning_rate` in the tree's direction.

use super::DecisionTreeClassifier;
use crate::backend::{ModelBackend, Prediction};
use crate::error::{DetectarError, Result};
use crate::primitives::Matrix;

/// Gradient-boosted tree classifier (depth-wise tree growth).
///
/// # Algorithm
///
/// 1. Initialize the raw prediction with the log-odds of class 1
/// 2. Each round: compute pseudo-residuals `y - sigmoid(raw)`, fit a tree
///    to their signs, move `raw` by `learning_rate` in the tree's direction
/// 3. Final probability = sigmoid(raw)
#[derive(Debug, Clone)]
pub struct GradientBoostingClassifier {
    n_estimators: usize,
    learning_rate: f32,
    max_depth: usize,
    init_prediction: f32,
    estimators: Vec<DecisionTreeClassifier>,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl GradientBoostingClassifier {
    /// Creates a classifier with default parameters
    /// (`n_estimators` 100, `learning_rate` 0.1, `max_depth` 3).
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            init_prediction: 0.0,
            estimators: Vec::new(),
        }
    }

    /// Sets the number of boosting rounds.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Sets the shrinkage applied to each tree's contribution.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets the maximum depth of each weak learner.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn sigmoid(x: f32) -> f32 {
        1.0 / (1.0 + (-x).exp())
    }

    /// Trains the ensemble on features and 0/1 labels.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if X and y disagree, `EmptyInput` for zero
    /// samples.
    pub fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        if x.n_rows() != y.len() {
            return Err(DetectarError::LengthMismatch {
                expected: x.n_rows(),
                actual: y.len(),
            });
        }
        if y.is_empty() {
            return Err(DetectarError::empty_input("boosting training data"));
        }

        let n_samples = x.n_rows();
        let y_float: Vec<f32> = y.iter().map(|&label| label as f32).collect();

        let positive = y.iter().filter(|&&label| label == 1).count();
        let p = positive as f32 / n_samples as f32;
        self.init_prediction = if p > 0.0 && p < 1.0 {
            (p / (1.0 - p)).ln()
        } else if p >= 1.0 {
            5.0
        } else {
            -5.0
        };

        let mut raw_predictions = vec![self.init_prediction; n_samples];
        self.estimators = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            let residual_labels: Vec<usize> = y_float
                .iter()
                .zip(raw_predictions.iter())
                .map(|(&yi, &raw)| usize::from(yi - Self::sigmoid(raw) >= 0.0))
                .collect();

            let mut tree = DecisionTreeClassifier::new().with_max_depth(self.max_depth);
            tree.fit(x, &residual_labels)?;

            // Tree output 0/1 maps to residual direction -1/+1.
            for (raw, pred) in raw_predictions.iter_mut().zip(tree.predict(x)) {
                let direction = if pred == 0 { -1.0 } else { 1.0 };
                *raw += self.learning_rate * direction;
            }

            self.estimators.push(tree);
        }

        Ok(())
    }

    /// Predicts class-1 probabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if called before `fit`.
    pub fn predict_proba(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        if self.estimators.is_empty() {
            return Err("boosting model not trained yet".into());
        }

        let n_samples = x.n_rows();
        let mut raw_predictions = vec![self.init_prediction; n_samples];

        for tree in &self.estimators {
            for (raw, pred) in raw_predictions.iter_mut().zip(tree.predict(x)) {
                let direction = if pred == 0 { -1.0 } else { 1.0 };
                *raw += self.learning_rate * direction;
            }
        }

        Ok(raw_predictions.iter().map(|&r| Self::sigmoid(r)).collect())
    }

    /// Predicts hard 0/1 labels at the 0.5 probability boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if called before `fit`.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        let probas = self.predict_proba(x)?;
        Ok(probas.iter().map(|&p| usize::from(p >= 0.5)).collect())
    }

    /// Number of trained trees.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.estimators.len()
    }
}

impl ModelBackend for GradientBoostingClassifier {
    fn name(&self) -> &str {
        "gbt"
    }

    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        GradientBoostingClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Prediction> {
        Ok(Prediction::Labels(GradientBoostingClassifier::predict(
            self, x,
        )?))
    }
}
