//! Preprocessing: minority oversampling and probability thresholding.
//!
//! [`Smote`] corrects class imbalance by synthesizing minority-class rows
//! through nearest-neighbor interpolation. [`Binarizer`] converts class-1
//! probabilities into hard labels with an inclusive decision threshold.

use crate::error::{DetectarError, Result};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Synthetic Minority Oversampling.
///
/// For each synthetic sample, a minority row is interpolated toward one of
/// its k nearest same-class neighbors with a uniform gap in [0, 1), until
/// both classes have exactly the same count.
///
/// # Examples
///
/// ```
/// use detectar::preprocessing::Smote;
/// use detectar::primitives::Matrix;
///
/// let x = Matrix::from_vec(5, 1, vec![0.0, 0.1, 0.2, 10.0, 10.5])
///     .expect("data length matches rows * cols");
/// let y = vec![0, 0, 0, 1, 1];
///
/// let smote = Smote::new().with_k_neighbors(1).with_random_state(7);
/// let (x_res, y_res) = smote.fit_resample(&x, &y).expect("resample succeeds");
/// assert_eq!(y_res.iter().filter(|&&c| c == 0).count(), 3);
/// assert_eq!(y_res.iter().filter(|&&c| c == 1).count(), 3);
/// assert_eq!(x_res.n_rows(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct Smote {
    k_neighbors: usize,
    random_state: Option<u64>,
}

impl Default for Smote {
    fn default() -> Self {
        Self::new()
    }
}

impl Smote {
    /// Creates a new balancer with default settings (5 neighbors, unseeded).
    #[must_use]
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            random_state: None,
        }
    }

    /// Sets the number of nearest neighbors used for interpolation.
    #[must_use]
    pub fn with_k_neighbors(mut self, k_neighbors: usize) -> Self {
        self.k_neighbors = k_neighbors;
        self
    }

    /// Sets the random state for reproducible resampling.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Resamples (X, y) so both classes have equal counts.
    ///
    /// The output contains every original row (in order) followed by the
    /// synthetic minority rows; synthetic rows are owned values with no
    /// back-reference to their sources. Output length is
    /// `2 * max(class counts)`.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if X and y disagree, `EmptyInput` on empty
    /// input, `Schema` unless y holds exactly two distinct classes,
    /// `InvalidHyperparameter` for a zero neighbor count, and
    /// `InsufficientSamples` when the minority class has fewer than
    /// `k_neighbors + 1` members.
    pub fn fit_resample(&self, x: &Matrix<f32>, y: &[usize]) -> Result<(Matrix<f32>, Vec<usize>)> {
        if x.n_rows() != y.len() {
            return Err(DetectarError::LengthMismatch {
                expected: x.n_rows(),
                actual: y.len(),
            });
        }
        if y.is_empty() {
            return Err(DetectarError::empty_input("resampling input"));
        }

        let mut class_indices: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &label) in y.iter().enumerate() {
            class_indices.entry(label).or_default().push(i);
        }
        if class_indices.len() != 2 {
            return Err(DetectarError::schema(format!(
                "resampling requires exactly two classes, got {}",
                class_indices.len()
            )));
        }

        let (&label_a, idx_a) = class_indices.iter().next().expect("two classes present");
        let (&label_b, idx_b) = class_indices.iter().last().expect("two classes present");
        let (minority_label, minority, majority_count) = if idx_a.len() <= idx_b.len() {
            (label_a, idx_a.clone(), idx_b.len())
        } else {
            (label_b, idx_b.clone(), idx_a.len())
        };

        let need = majority_count - minority.len();
        if need == 0 {
            return Ok((x.clone(), y.to_vec()));
        }

        if self.k_neighbors == 0 {
            return Err(DetectarError::InvalidHyperparameter {
                param: "k_neighbors".to_string(),
                value: "0".to_string(),
                constraint: ">= 1".to_string(),
            });
        }
        // Interpolation needs k distinct neighbors besides the sample itself.
        if self.k_neighbors > minority.len().saturating_sub(1) {
            return Err(DetectarError::InsufficientSamples {
                class: minority_label,
                available: minority.len(),
                required: self.k_neighbors + 1,
            });
        }

        let neighbors = nearest_neighbors(x, &minority, self.k_neighbors);

        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let n_features = x.n_cols();
        let mut data = Vec::with_capacity((y.len() + need) * n_features);
        data.extend_from_slice(x.as_slice());
        let mut labels = y.to_vec();

        for i in 0..need {
            let base_pos = i % minority.len();
            let base = x.row_slice(minority[base_pos]);
            let pick = rng.gen_range(0..self.k_neighbors);
            let neighbor = x.row_slice(neighbors[base_pos][pick]);
            let gap: f32 = rng.gen();

            for j in 0..n_features {
                data.push(base[j] + gap * (neighbor[j] - base[j]));
            }
            labels.push(minority_label);
        }

        let resampled = Matrix::from_vec(y.len() + need, n_features, data)
            .map_err(|e| DetectarError::Other(e.to_string()))?;
        Ok((resampled, labels))
    }
}

/// For each minority row, the k nearest other minority rows (by squared
/// euclidean distance), as absolute row indices into `x`.
fn nearest_neighbors(x: &Matrix<f32>, minority: &[usize], k: usize) -> Vec<Vec<usize>> {
    minority
        .iter()
        .map(|&row| {
            let base = x.row_slice(row);
            let mut candidates: Vec<(f32, usize)> = minority
                .iter()
                .filter(|&&other| other != row)
                .map(|&other| (squared_distance(base, x.row_slice(other)), other))
                .collect();
            candidates.sort_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            });
            candidates.into_iter().take(k).map(|(_, idx)| idx).collect()
        })
        .collect()
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&ai, &bi)| (ai - bi) * (ai - bi))
        .sum()
}

/// Converts class-1 probabilities to hard labels.
///
/// Pure, total, elementwise: `p >= threshold` maps to 1, `p < threshold`
/// maps to 0. The comparison is inclusive on the positive side, so a
/// probability exactly at the threshold is class 1.
///
/// # Examples
///
/// ```
/// use detectar::preprocessing::Binarizer;
///
/// let binarizer = Binarizer::new();
/// assert_eq!(binarizer.transform(&[0.2, 0.5, 0.9]), vec![0, 1, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct Binarizer {
    threshold: f32,
}

impl Default for Binarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Binarizer {
    /// Creates a binarizer with the default 0.5 threshold.
    #[must_use]
    pub fn new() -> Self {
        Self { threshold: 0.5 }
    }

    /// Sets the decision threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Returns the decision threshold.
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Maps every probability to a 0/1 label.
    #[must_use]
    pub fn transform(&self, probabilities: &[f32]) -> Vec<usize> {
        probabilities
            .iter()
            .map(|&p| usize::from(p >= self.threshold))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cluster_data() -> (Matrix<f32>, Vec<usize>) {
        let x = Matrix::from_vec(
            8,
            2,
            vec![
                0.0, 0.0, // majority cluster
                0.2, 0.1, //
                0.1, 0.3, //
                0.4, 0.2, //
                0.3, 0.4, //
                5.0, 5.0, // minority cluster
                5.5, 5.2, //
                5.2, 5.6, //
            ],
        )
        .expect("valid dims");
        let y = vec![0, 0, 0, 0, 0, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_exact_balance() {
        let (x, y) = two_cluster_data();
        let smote = Smote::new().with_k_neighbors(2).with_random_state(7);
        let (x_res, y_res) = smote.fit_resample(&x, &y).expect("resample succeeds");

        let zeros = y_res.iter().filter(|&&c| c == 0).count();
        let ones = y_res.iter().filter(|&&c| c == 1).count();
        assert_eq!(zeros, ones);
        assert_eq!(x_res.n_rows(), 2 * 5);
        assert_eq!(x_res.n_rows(), y_res.len());
    }

    #[test]
    fn test_original_rows_preserved_in_order() {
        let (x, y) = two_cluster_data();
        let smote = Smote::new().with_k_neighbors(2).with_random_state(7);
        let (x_res, y_res) = smote.fit_resample(&x, &y).expect("resample succeeds");

        for row in 0..x.n_rows() {
            assert_eq!(x_res.row_slice(row), x.row_slice(row));
            assert_eq!(y_res[row], y[row]);
        }
    }

    #[test]
    fn test_synthetic_rows_interpolate_minority_cluster() {
        let (x, y) = two_cluster_data();
        let smote = Smote::new().with_k_neighbors(2).with_random_state(42);
        let (x_res, y_res) = smote.fit_resample(&x, &y).expect("resample succeeds");

        // Synthetic rows are convex combinations of minority rows, so every
        // coordinate stays inside the minority cluster's bounding box.
        for row in x.n_rows()..x_res.n_rows() {
            assert_eq!(y_res[row], 1);
            for col in 0..2 {
                let v = x_res.get(row, col);
                assert!((5.0..=5.6).contains(&v), "synthetic value {v} out of cluster");
            }
        }
    }

    #[test]
    fn test_deterministic_under_seed() {
        let (x, y) = two_cluster_data();
        let smote = Smote::new().with_k_neighbors(2).with_random_state(123);
        let first = smote.fit_resample(&x, &y).expect("resample succeeds");
        let second = smote.fit_resample(&x, &y).expect("resample succeeds");
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_already_balanced_passthrough() {
        let x = Matrix::from_vec(4, 1, vec![0.0, 1.0, 10.0, 11.0]).expect("valid dims");
        let y = vec![0, 0, 1, 1];
        let (x_res, y_res) = Smote::new().fit_resample(&x, &y).expect("resample succeeds");
        assert_eq!(x_res, x);
        assert_eq!(y_res, y);
    }

    #[test]
    fn test_insufficient_minority_samples() {
        let x = Matrix::from_vec(4, 1, vec![0.0, 1.0, 2.0, 10.0]).expect("valid dims");
        let y = vec![0, 0, 0, 1];
        let result = Smote::new().with_k_neighbors(1).fit_resample(&x, &y);
        assert!(matches!(
            result,
            Err(DetectarError::InsufficientSamples {
                class: 1,
                available: 1,
                required: 2,
            })
        ));
    }

    #[test]
    fn test_requires_two_classes() {
        let x = Matrix::from_vec(3, 1, vec![0.0, 1.0, 2.0]).expect("valid dims");
        let result = Smote::new().fit_resample(&x, &[0, 0, 0]);
        assert!(matches!(result, Err(DetectarError::Schema { .. })));
    }

    #[test]
    fn test_length_mismatch() {
        let x = Matrix::from_vec(3, 1, vec![0.0, 1.0, 2.0]).expect("valid dims");
        let result = Smote::new().fit_resample(&x, &[0, 1]);
        assert!(matches!(result, Err(DetectarError::LengthMismatch { .. })));
    }

    #[test]
    fn test_zero_neighbors_rejected() {
        // Imbalanced on purpose: balanced input short-circuits before the check.
        let x = Matrix::from_vec(5, 1, vec![0.0, 1.0, 2.0, 10.0, 11.0]).expect("valid dims");
        let y = vec![0, 0, 0, 1, 1];
        let result = Smote::new().with_k_neighbors(0).fit_resample(&x, &y);
        assert!(matches!(
            result,
            Err(DetectarError::InvalidHyperparameter { .. })
        ));
    }

    #[test]
    fn test_binarizer_boundary_inclusive() {
        let binarizer = Binarizer::new();
        assert_eq!(binarizer.transform(&[0.5]), vec![1]);
        assert_eq!(binarizer.transform(&[0.4999]), vec![0]);
    }

    #[test]
    fn test_binarizer_elementwise_total() {
        let binarizer = Binarizer::new().with_threshold(0.8);
        assert_eq!(
            binarizer.transform(&[0.0, 0.79, 0.8, 0.81, 1.0]),
            vec![0, 0, 1, 1, 1]
        );
        assert_eq!(binarizer.transform(&[]), Vec::<usize>::new());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn balance_is_exact(minority in 3usize..12, extra in 1usize..20, seed in 0u64..1000) {
                let majority = minority + extra;
                let n = minority + majority;
                let mut data = Vec::with_capacity(n * 2);
                let mut y = Vec::with_capacity(n);
                for i in 0..majority {
                    data.extend_from_slice(&[i as f32 * 0.1, 0.0]);
                    y.push(0);
                }
                for i in 0..minority {
                    data.extend_from_slice(&[100.0 + i as f32, 1.0]);
                    y.push(1);
                }
                let x = Matrix::from_vec(n, 2, data).expect("valid dims");

                let smote = Smote::new().with_k_neighbors(2).with_random_state(seed);
                let (x_res, y_res) = smote.fit_resample(&x, &y).expect("resample succeeds");

                let zeros = y_res.iter().filter(|&&c| c == 0).count();
                let ones = y_res.iter().filter(|&&c| c == 1).count();
                prop_assert_eq!(zeros, ones);
                prop_assert_eq!(x_res.n_rows(), 2 * majority);
            }
        }
    }
}
