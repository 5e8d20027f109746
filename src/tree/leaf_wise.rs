//! Leaf-wise gradient boosting for binary classification.
//!
//! Differs from [`super::GradientBoostingClassifier`] in how each weak
//! learner grows: instead of expanding every node level by level, the
//! tree repeatedly splits whichever leaf offers the largest impurity
//! gain, until `num_leaves` is reached. Deep, narrow trees come out of
//! this, which is why the depth cap stays as a guard.
//!
//! Predictions are class-1 probabilities; the caller thresholds them.

use super::{find_best_split, majority_class, Leaf, Node, TreeNode};
use crate::backend::{ModelBackend, Prediction};
use crate::error::{DetectarError, Result};
use crate::primitives::Matrix;

/// Leaf-wise (best-first) boosted tree classifier.
#[derive(Debug, Clone)]
pub struct LeafWiseBoostingClassifier {
    n_estimators: usize,
    learning_rate: f32,
    num_leaves: usize,
    max_depth: Option<usize>,
    init_prediction: f32,
    estimators: Vec<TreeNode>,
}

impl Default for LeafWiseBoostingClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LeafWiseBoostingClassifier {
    /// Creates a classifier with default parameters
    /// (`n_estimators` 50, `learning_rate` 0.1, `num_leaves` 31, no depth
    /// cap).
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 0.1,
            num_leaves: 31,
            max_depth: None,
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

    /// Sets the maximum number of leaves per tree.
    #[must_use]
    pub fn with_num_leaves(mut self, num_leaves: usize) -> Self {
        self.num_leaves = num_leaves;
        self
    }

    /// Sets the depth guard for each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    fn sigmoid(x: f32) -> f32 {
        1.0 / (1.0 + (-x).exp())
    }

    /// Trains the ensemble on features and 0/1 labels.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` when `num_leaves < 2`,
    /// `LengthMismatch` if X and y disagree, `EmptyInput` for zero
    /// samples.
    pub fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        if self.num_leaves < 2 {
            return Err(DetectarError::InvalidHyperparameter {
                param: "num_leaves".to_string(),
                value: self.num_leaves.to_string(),
                constraint: "at least 2".to_string(),
            });
        }
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
            let residual_labels: Vec<usize> = y
                .iter()
                .zip(raw_predictions.iter())
                .map(|(&yi, &raw)| usize::from(yi as f32 - Self::sigmoid(raw) >= 0.0))
                .collect();

            let tree =
                build_tree_best_first(x, &residual_labels, self.num_leaves, self.max_depth);

            for (raw, pred) in raw_predictions.iter_mut().zip(predict_all(&tree, x)) {
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
            for (raw, pred) in raw_predictions.iter_mut().zip(predict_all(tree, x)) {
                let direction = if pred == 0 { -1.0 } else { 1.0 };
                *raw += self.learning_rate * direction;
            }
        }

        Ok(raw_predictions.iter().map(|&r| Self::sigmoid(r)).collect())
    }

    /// Number of trained trees.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.estimators.len()
    }
}

impl ModelBackend for LeafWiseBoostingClassifier {
    fn name(&self) -> &str {
        "lgbm"
    }

    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        LeafWiseBoostingClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Prediction> {
        Ok(Prediction::Probabilities(self.predict_proba(x)?))
    }
}

fn predict_all(tree: &TreeNode, x: &Matrix<f32>) -> Vec<usize> {
    (0..x.n_rows())
        .map(|row| {
            let mut node = tree;
            loop {
                match node {
                    TreeNode::Leaf(leaf) => return leaf.class_label,
                    TreeNode::Node(internal) => {
                        if x.get(row, internal.feature_idx) <= internal.threshold {
                            node = &internal.left;
                        } else {
                            node = &internal.right;
                        }
                    }
                }
            }
        })
        .collect()
}

/// One node of the tree while it is being grown.
struct GrowingNode {
    indices: Vec<usize>,
    depth: usize,
    split: Option<(usize, f32)>,
    children: Option<(usize, usize)>,
}

/// Best split for a growing leaf, or None when it may not be expanded.
fn candidate_split(
    x: &Matrix<f32>,
    y: &[usize],
    node: &GrowingNode,
    max_depth: Option<usize>,
) -> Option<(usize, f32, f32)> {
    if let Some(max_d) = max_depth {
        if node.depth >= max_d {
            return None;
        }
    }
    find_best_split(x, y, &node.indices)
}

/// Grows a tree best-first: always split the frontier leaf with the
/// largest impurity gain, stop at `num_leaves` leaves or when no leaf
/// improves.
pub(crate) fn build_tree_best_first(
    x: &Matrix<f32>,
    y: &[usize],
    num_leaves: usize,
    max_depth: Option<usize>,
) -> TreeNode {
    let root = GrowingNode {
        indices: (0..y.len()).collect(),
        depth: 0,
        split: None,
        children: None,
    };
    let mut candidates = vec![candidate_split(x, y, &root, max_depth)];
    let mut nodes = vec![root];
    let mut n_leaves = 1;

    while n_leaves < num_leaves {
        // Frontier scan in node order, so gain ties resolve to the
        // earliest-created leaf.
        let mut best: Option<(usize, usize, f32, f32)> = None;
        for (id, candidate) in candidates.iter().enumerate() {
            if nodes[id].children.is_some() {
                continue;
            }
            if let Some((feature_idx, threshold, gain)) = *candidate {
                if gain > 0.0 && best.map_or(true, |(_, _, _, g)| gain > g) {
                    best = Some((id, feature_idx, threshold, gain));
                }
            }
        }
        let Some((id, feature_idx, threshold, _gain)) = best else {
            break;
        };

        let depth = nodes[id].depth;
        let parent_indices = std::mem::take(&mut nodes[id].indices);
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = parent_indices
            .into_iter()
            .partition(|&idx| x.get(idx, feature_idx) <= threshold);

        let left = GrowingNode {
            indices: left_indices,
            depth: depth + 1,
            split: None,
            children: None,
        };
        let right = GrowingNode {
            indices: right_indices,
            depth: depth + 1,
            split: None,
            children: None,
        };

        let left_id = nodes.len();
        let right_id = nodes.len() + 1;
        candidates.push(candidate_split(x, y, &left, max_depth));
        candidates.push(candidate_split(x, y, &right, max_depth));
        nodes.push(left);
        nodes.push(right);

        nodes[id].split = Some((feature_idx, threshold));
        nodes[id].children = Some((left_id, right_id));
        n_leaves += 1;
    }

    freeze(&nodes, 0, y)
}

/// Converts the grown arena into the shared [`TreeNode`] representation.
fn freeze(nodes: &[GrowingNode], id: usize, y: &[usize]) -> TreeNode {
    let node = &nodes[id];
    match (node.children, node.split) {
        (Some((left_id, right_id)), Some((feature_idx, threshold))) => TreeNode::Node(Node {
            feature_idx,
            threshold,
            left: Box::new(freeze(nodes, left_id, y)),
            right: Box::new(freeze(nodes, right_id, y)),
        }),
        _ => TreeNode::Leaf(Leaf {
            class_label: majority_class(y, &node.indices),
            n_samples: node.indices.len(),
        }),
    }
}
