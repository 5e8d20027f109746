//! Decision tree algorithms and ensemble methods.
//!
//! This module implements:
//! - CART classification trees using Gini impurity
//! - Random Forest ensemble classifier (bootstrap aggregation)
//! - Depth-wise gradient boosting ([`GradientBoostingClassifier`])
//! - Leaf-wise (best-first) gradient boosting ([`LeafWiseBoostingClassifier`])
//!
//! The ensembles implement [`crate::backend::ModelBackend`], so the
//! pipeline drives them through the uniform train/predict contract.

mod gradient_boosting;
mod leaf_wise;

pub use gradient_boosting::GradientBoostingClassifier;
pub use leaf_wise::LeafWiseBoostingClassifier;

use crate::backend::{ModelBackend, Prediction};
use crate::error::{DetectarError, Result};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};

/// Internal node in a decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Index of the feature to split on
    pub feature_idx: usize,
    /// Threshold value for the split
    pub threshold: f32,
    /// Left subtree (samples where feature <= threshold)
    pub left: Box<TreeNode>,
    /// Right subtree (samples where feature > threshold)
    pub right: Box<TreeNode>,
}

/// Leaf node carrying the predicted class and the training sample count
/// that reached it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaf {
    /// Predicted class label for this leaf
    pub class_label: usize,
    /// Number of training samples in this leaf
    pub n_samples: usize,
}

/// A node in a decision tree (either internal node or leaf).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal decision node with split condition
    Node(Node),
    /// Leaf node with class prediction
    Leaf(Leaf),
}

impl TreeNode {
    /// Returns the depth of the tree rooted at this node.
    ///
    /// Leaf nodes have depth 0, internal nodes 1 + max(left, right).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 0,
            TreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    /// Returns the number of leaves under this node.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 1,
            TreeNode::Node(node) => node.left.n_leaves() + node.right.n_leaves(),
        }
    }
}

/// Decision tree classifier using the CART algorithm.
///
/// Uses Gini impurity for the splitting criterion and recursive
/// depth-first growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    tree: Option<TreeNode>,
    max_depth: Option<usize>,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeClassifier {
    /// Creates a new decision tree classifier with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: None,
            max_depth: None,
        }
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Fits the tree to training data.
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
            return Err(DetectarError::empty_input("tree training data"));
        }

        let indices: Vec<usize> = (0..y.len()).collect();
        self.tree = Some(build_tree(x, y, &indices, 0, self.max_depth));
        Ok(())
    }

    /// Predicts class labels for samples.
    ///
    /// # Panics
    ///
    /// Panics if called before a successful `fit`.
    #[must_use]
    pub fn predict(&self, x: &Matrix<f32>) -> Vec<usize> {
        let tree = self.tree.as_ref().expect("model not fitted yet");
        (0..x.n_rows())
            .map(|row| predict_one(tree, x.row_slice(row)))
            .collect()
    }

    /// Returns the fitted tree, if any.
    #[must_use]
    pub fn tree(&self) -> Option<&TreeNode> {
        self.tree.as_ref()
    }
}

fn predict_one(tree: &TreeNode, sample: &[f32]) -> usize {
    let mut node = tree;
    loop {
        match node {
            TreeNode::Leaf(leaf) => return leaf.class_label,
            TreeNode::Node(internal) => {
                // NaN comparisons are false, so missing values fall right.
                if sample[internal.feature_idx] <= internal.threshold {
                    node = &internal.left;
                } else {
                    node = &internal.right;
                }
            }
        }
    }
}

// ========================================================================
// Tree building
// ========================================================================

/// Gini impurity of the labels selected by `indices`.
pub(crate) fn gini_impurity(y: &[usize], indices: &[usize]) -> f32 {
    if indices.is_empty() {
        return 0.0;
    }

    let mut counts = std::collections::BTreeMap::new();
    for &idx in indices {
        *counts.entry(y[idx]).or_insert(0usize) += 1;
    }

    let n = indices.len() as f32;
    let mut gini = 1.0;
    for count in counts.values() {
        let p = *count as f32 / n;
        gini -= p * p;
    }
    gini
}

/// Weighted Gini impurity of a candidate partition.
fn gini_split(y: &[usize], left: &[usize], right: &[usize]) -> f32 {
    let n_left = left.len() as f32;
    let n_right = right.len() as f32;
    let n_total = n_left + n_right;
    if n_total == 0.0 {
        return 0.0;
    }

    (n_left / n_total) * gini_impurity(y, left) + (n_right / n_total) * gini_impurity(y, right)
}

/// Majority class among the labels selected by `indices`.
///
/// Ties break toward the lowest class label (deterministic iteration via
/// BTreeMap).
pub(crate) fn majority_class(y: &[usize], indices: &[usize]) -> usize {
    let mut counts = std::collections::BTreeMap::new();
    for &idx in indices {
        *counts.entry(y[idx]).or_insert(0usize) += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .expect("at least one label should exist")
        .0
}

/// Partition `indices` by a feature threshold. Returns None when one side
/// would be empty.
fn partition_by_threshold(
    x: &Matrix<f32>,
    indices: &[usize],
    feature_idx: usize,
    threshold: f32,
) -> Option<(Vec<usize>, Vec<usize>)> {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for &idx in indices {
        if x.get(idx, feature_idx) <= threshold {
            left.push(idx);
        } else {
            right.push(idx);
        }
    }
    if left.is_empty() || right.is_empty() {
        None
    } else {
        Some((left, right))
    }
}

/// Best (feature, threshold, gain) over all features for the subset, or
/// None when no split improves impurity. Thresholds are midpoints between
/// sorted distinct values; NaN cells never produce thresholds.
pub(crate) fn find_best_split(
    x: &Matrix<f32>,
    y: &[usize],
    indices: &[usize],
) -> Option<(usize, f32, f32)> {
    if indices.len() < 2 {
        return None;
    }

    let current_impurity = gini_impurity(y, indices);
    let mut best: Option<(usize, f32, f32)> = None;

    for feature_idx in 0..x.n_cols() {
        let mut values: Vec<f32> = indices
            .iter()
            .map(|&idx| x.get(idx, feature_idx))
            .filter(|v| !v.is_nan())
            .collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let Some((left, right)) = partition_by_threshold(x, indices, feature_idx, threshold)
            else {
                continue;
            };
            let gain = current_impurity - gini_split(y, &left, &right);
            if gain > best.map_or(0.0, |(_, _, g)| g) {
                best = Some((feature_idx, threshold, gain));
            }
        }
    }

    best
}

/// Builds a CART tree recursively (depth-first).
fn build_tree(
    x: &Matrix<f32>,
    y: &[usize],
    indices: &[usize],
    depth: usize,
    max_depth: Option<usize>,
) -> TreeNode {
    let n_samples = indices.len();

    // Pure node
    let first = y[indices[0]];
    if indices.iter().all(|&idx| y[idx] == first) {
        return TreeNode::Leaf(Leaf {
            class_label: first,
            n_samples,
        });
    }

    // Depth bound
    if let Some(max_d) = max_depth {
        if depth >= max_d {
            return TreeNode::Leaf(Leaf {
                class_label: majority_class(y, indices),
                n_samples,
            });
        }
    }

    let Some((feature_idx, threshold, _gain)) = find_best_split(x, y, indices) else {
        return TreeNode::Leaf(Leaf {
            class_label: majority_class(y, indices),
            n_samples,
        });
    };

    let Some((left_indices, right_indices)) =
        partition_by_threshold(x, indices, feature_idx, threshold)
    else {
        return TreeNode::Leaf(Leaf {
            class_label: majority_class(y, indices),
            n_samples,
        });
    };

    TreeNode::Node(Node {
        feature_idx,
        threshold,
        left: Box::new(build_tree(x, y, &left_indices, depth + 1, max_depth)),
        right: Box::new(build_tree(x, y, &right_indices, depth + 1, max_depth)),
    })
}

// ========================================================================
// Random Forest
// ========================================================================

/// Random Forest classifier: bootstrap-sampled CART trees with majority
/// voting.
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTreeClassifier>,
    n_estimators: usize,
    max_depth: Option<usize>,
    random_state: Option<u64>,
}

impl RandomForestClassifier {
    /// Creates a new Random Forest classifier.
    ///
    /// # Arguments
    ///
    /// * `n_estimators` - Number of trees in the forest
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            random_state: None,
        }
    }

    /// Sets the maximum depth for each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets the random state for reproducible bootstrap sampling.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Fits one tree per bootstrap sample.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` or `EmptyInput` on invalid training data.
    pub fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        if x.n_rows() != y.len() {
            return Err(DetectarError::LengthMismatch {
                expected: x.n_rows(),
                actual: y.len(),
            });
        }
        if y.is_empty() {
            return Err(DetectarError::empty_input("forest training data"));
        }

        let n_samples = x.n_rows();
        self.trees = Vec::with_capacity(self.n_estimators);

        for i in 0..self.n_estimators {
            let seed = self.random_state.map(|s| s + i as u64);
            let bootstrap = bootstrap_sample(n_samples, seed);

            let bootstrap_x = x.select_rows(&bootstrap);
            let bootstrap_y: Vec<usize> = bootstrap.iter().map(|&idx| y[idx]).collect();

            let mut tree = match self.max_depth {
                Some(depth) => DecisionTreeClassifier::new().with_max_depth(depth),
                None => DecisionTreeClassifier::new(),
            };
            tree.fit(&bootstrap_x, &bootstrap_y)?;
            self.trees.push(tree);
        }

        Ok(())
    }

    /// Majority-vote predictions across all trees.
    ///
    /// # Errors
    ///
    /// Returns an error if called before `fit`.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        if self.trees.is_empty() {
            return Err("forest not trained yet".into());
        }

        let n_samples = x.n_rows();
        let per_tree: Vec<Vec<usize>> = self.trees.iter().map(|t| t.predict(x)).collect();

        let mut predictions = Vec::with_capacity(n_samples);
        for sample_idx in 0..n_samples {
            let mut votes = std::collections::BTreeMap::new();
            for tree_preds in &per_tree {
                *votes.entry(tree_preds[sample_idx]).or_insert(0usize) += 1;
            }
            // BTreeMap order makes ties break toward the lowest label.
            let winner = votes
                .into_iter()
                .max_by_key(|&(_, count)| count)
                .map(|(class, _)| class)
                .unwrap_or(0);
            predictions.push(winner);
        }

        Ok(predictions)
    }
}

impl ModelBackend for RandomForestClassifier {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        RandomForestClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Prediction> {
        Ok(Prediction::Labels(RandomForestClassifier::predict(
            self, x,
        )?))
    }
}

/// Draws `n_samples` indices with replacement, seeded when a random state
/// is given.
fn bootstrap_sample(n_samples: usize, random_state: Option<u64>) -> Vec<usize> {
    use rand::distributions::{Distribution, Uniform};
    use rand::SeedableRng;

    let dist = Uniform::from(0..n_samples);
    let mut rng = match random_state {
        Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
        None => rand::rngs::StdRng::from_entropy(),
    };

    (0..n_samples).map(|_| dist.sample(&mut rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_data() -> (Matrix<f32>, Vec<usize>) {
        let x = Matrix::from_vec(
            8,
            2,
            vec![
                0.0, 0.0, //
                0.5, 0.2, //
                0.2, 0.8, //
                0.9, 0.4, //
                5.0, 5.0, //
                5.5, 5.2, //
                5.2, 5.8, //
                5.9, 5.4, //
            ],
        )
        .expect("valid dims");
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_gini_impurity_pure_and_mixed() {
        let y = vec![0, 0, 0, 0];
        assert_eq!(gini_impurity(&y, &[0, 1, 2, 3]), 0.0);

        let y = vec![0, 0, 1, 1];
        assert!((gini_impurity(&y, &[0, 1, 2, 3]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_majority_class_tie_breaks_low() {
        let y = vec![1, 0, 1, 0];
        assert_eq!(majority_class(&y, &[0, 1, 2, 3]), 0);
    }

    #[test]
    fn test_tree_fits_separable_data() {
        let (x, y) = separable_data();
        let mut tree = DecisionTreeClassifier::new().with_max_depth(3);
        tree.fit(&x, &y).expect("fit succeeds");
        assert_eq!(tree.predict(&x), y);
    }

    #[test]
    fn test_tree_depth_bound() {
        let (x, y) = separable_data();
        let mut tree = DecisionTreeClassifier::new().with_max_depth(1);
        tree.fit(&x, &y).expect("fit succeeds");
        assert!(tree.tree().expect("fitted").depth() <= 1);
    }

    #[test]
    fn test_tree_rejects_empty_input() {
        let x = Matrix::from_vec(0, 2, vec![]).expect("valid dims");
        let mut tree = DecisionTreeClassifier::new();
        assert!(matches!(
            tree.fit(&x, &[]),
            Err(DetectarError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_tree_rejects_length_mismatch() {
        let (x, _) = separable_data();
        let mut tree = DecisionTreeClassifier::new();
        assert!(matches!(
            tree.fit(&x, &[0, 1]),
            Err(DetectarError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_nan_features_fall_right() {
        let x = Matrix::from_vec(4, 1, vec![0.0, 1.0, 10.0, 11.0]).expect("valid dims");
        let y = vec![0, 0, 1, 1];
        let mut tree = DecisionTreeClassifier::new();
        tree.fit(&x, &y).expect("fit succeeds");

        let probe = Matrix::from_vec(1, 1, vec![f32::NAN]).expect("valid dims");
        // NaN <= threshold is false at every node, so the sample lands in
        // the rightmost leaf (the high-value class here).
        assert_eq!(tree.predict(&probe), vec![1]);
    }

    #[test]
    fn test_forest_fits_and_predicts() {
        let (x, y) = separable_data();
        let mut forest = RandomForestClassifier::new(15).with_random_state(7);
        forest.fit(&x, &y).expect("fit succeeds");
        assert_eq!(forest.predict(&x).expect("fitted"), y);
    }

    #[test]
    fn test_forest_deterministic_with_seed() {
        let (x, y) = separable_data();
        let mut a = RandomForestClassifier::new(10).with_random_state(42);
        let mut b = RandomForestClassifier::new(10).with_random_state(42);
        a.fit(&x, &y).expect("fit succeeds");
        b.fit(&x, &y).expect("fit succeeds");
        assert_eq!(a.predict(&x).expect("fitted"), b.predict(&x).expect("fitted"));
    }

    #[test]
    fn test_forest_unfitted_predict_errors() {
        let (x, _) = separable_data();
        let forest = RandomForestClassifier::new(5);
        assert!(forest.predict(&x).is_err());
    }

    #[test]
    fn test_forest_as_backend() {
        let (x, y) = separable_data();
        let mut backend: Box<dyn ModelBackend> =
            Box::new(RandomForestClassifier::new(10).with_random_state(1));
        backend.fit(&x, &y).expect("fit succeeds");
        match backend.predict(&x).expect("fitted") {
            Prediction::Labels(labels) => assert_eq!(labels, y),
            Prediction::Probabilities(_) => panic!("forest predicts labels"),
        }
    }

    #[test]
    fn test_bootstrap_sample_seeded() {
        let a = bootstrap_sample(20, Some(9));
        let b = bootstrap_sample(20, Some(9));
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
        assert!(a.iter().all(|&idx| idx < 20));
    }
}
