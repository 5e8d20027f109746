//! Train/test partitioning with class stratification.
//!
//! The split is computed within each class independently and then
//! concatenated, so the class proportions of the full data carry over to
//! both partitions within rounding. A fixed seed makes the assignment a
//! pure function of the inputs.

use crate::error::{DetectarError, Result};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Four co-indexed containers produced by a stratified split.
///
/// Treated as a frozen value by every consumer: backends read it, nothing
/// mutates it.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    /// Training features.
    pub x_train: Matrix<f32>,
    /// Held-out features.
    pub x_test: Matrix<f32>,
    /// Training labels, aligned with `x_train`.
    pub y_train: Vec<usize>,
    /// Held-out labels, aligned with `x_test`.
    pub y_test: Vec<usize>,
}

/// Computes stratified (train, test) row indices for `y`.
///
/// Within each class the indices are shuffled and the first
/// `round(test_size * class_count)` go to the test partition; classes are
/// visited in ascending label order, so the same seed always yields the
/// same assignment.
///
/// # Errors
///
/// Returns `InvalidHyperparameter` unless `0 < test_size < 1` and both
/// partitions end up non-empty, `EmptyInput` for empty `y`.
pub fn stratified_split_indices(
    y: &[usize],
    test_size: f32,
    random_state: Option<u64>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(DetectarError::InvalidHyperparameter {
            param: "test_size".to_string(),
            value: format!("{test_size}"),
            constraint: "0 < test_size < 1".to_string(),
        });
    }
    if y.is_empty() {
        return Err(DetectarError::empty_input("labels to split"));
    }

    let mut class_indices: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        class_indices.entry(label).or_default().push(i);
    }

    let mut rng = match random_state {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();
    for indices in class_indices.values() {
        let mut shuffled = indices.clone();
        shuffled.shuffle(&mut rng);

        let n_test = (shuffled.len() as f32 * test_size).round() as usize;
        test_indices.extend_from_slice(&shuffled[..n_test]);
        train_indices.extend_from_slice(&shuffled[n_test..]);
    }

    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(DetectarError::InvalidHyperparameter {
            param: "test_size".to_string(),
            value: format!("{test_size}"),
            constraint: "must leave both partitions non-empty".to_string(),
        });
    }

    Ok((train_indices, test_indices))
}

/// Splits (X, y) into stratified train and test subsets.
///
/// # Errors
///
/// Returns `LengthMismatch` if X and y disagree, plus every error of
/// [`stratified_split_indices`].
///
/// # Examples
///
/// ```
/// use detectar::model_selection::stratified_train_test_split;
/// use detectar::primitives::Matrix;
///
/// let x = Matrix::from_vec(10, 1, (0..10).map(|i| i as f32).collect())
///     .expect("data length matches rows * cols");
/// let y = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
///
/// let split = stratified_train_test_split(&x, &y, 0.2, Some(42)).expect("valid split");
/// assert_eq!(split.y_test.len(), 2);
/// assert_eq!(split.y_train.len(), 8);
/// ```
pub fn stratified_train_test_split(
    x: &Matrix<f32>,
    y: &[usize],
    test_size: f32,
    random_state: Option<u64>,
) -> Result<TrainTestSplit> {
    if x.n_rows() != y.len() {
        return Err(DetectarError::LengthMismatch {
            expected: x.n_rows(),
            actual: y.len(),
        });
    }

    let (train_indices, test_indices) = stratified_split_indices(y, test_size, random_state)?;

    let y_train = train_indices.iter().map(|&i| y[i]).collect();
    let y_test = test_indices.iter().map(|&i| y[i]).collect();

    Ok(TrainTestSplit {
        x_train: x.select_rows(&train_indices),
        x_test: x.select_rows(&test_indices),
        y_train,
        y_test,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced_labels(n0: usize, n1: usize) -> Vec<usize> {
        let mut y = vec![0; n0];
        y.extend(vec![1; n1]);
        y
    }

    fn feature_ramp(n: usize) -> Matrix<f32> {
        Matrix::from_vec(n, 1, (0..n).map(|i| i as f32).collect()).expect("valid dims")
    }

    #[test]
    fn test_split_sizes() {
        let y = imbalanced_labels(8, 2);
        let x = feature_ramp(10);
        let split = stratified_train_test_split(&x, &y, 0.3, Some(7)).expect("valid split");

        assert_eq!(split.y_train.len() + split.y_test.len(), 10);
        assert_eq!(split.x_train.n_rows(), split.y_train.len());
        assert_eq!(split.x_test.n_rows(), split.y_test.len());
    }

    #[test]
    fn test_stratification_per_class_rounding() {
        let y = imbalanced_labels(80, 20);
        let x = feature_ramp(100);
        let split = stratified_train_test_split(&x, &y, 0.3, Some(7)).expect("valid split");

        // round(0.3 * 80) = 24 majority, round(0.3 * 20) = 6 minority.
        assert_eq!(split.y_test.len(), 30);
        assert_eq!(split.y_test.iter().filter(|&&c| c == 1).count(), 6);
        assert_eq!(split.y_train.iter().filter(|&&c| c == 1).count(), 14);
    }

    #[test]
    fn test_class_fraction_within_one_sample() {
        let y = imbalanced_labels(67, 23);
        let x = feature_ramp(90);
        let split = stratified_train_test_split(&x, &y, 0.3, Some(11)).expect("valid split");

        let overall = 23.0 / 90.0;
        let train_frac = split.y_train.iter().filter(|&&c| c == 1).count() as f32
            / split.y_train.len() as f32;
        assert!(
            (train_frac - overall).abs() < 1.0 / split.y_train.len() as f32,
            "train fraction {train_frac} deviates from {overall}"
        );
    }

    #[test]
    fn test_determinism_same_seed() {
        let y = imbalanced_labels(30, 10);
        let first = stratified_split_indices(&y, 0.25, Some(7)).expect("valid split");
        let second = stratified_split_indices(&y, 0.25, Some(7)).expect("valid split");
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_differ() {
        let y = imbalanced_labels(30, 10);
        let first = stratified_split_indices(&y, 0.25, Some(7)).expect("valid split");
        let second = stratified_split_indices(&y, 0.25, Some(8)).expect("valid split");
        assert_ne!(first, second);
    }

    #[test]
    fn test_indices_partition_the_input() {
        let y = imbalanced_labels(12, 4);
        let (train, test) = stratified_split_indices(&y, 0.25, Some(3)).expect("valid split");

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        let expected: Vec<usize> = (0..16).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_invalid_test_size() {
        let y = imbalanced_labels(5, 5);
        for bad in [0.0, 1.0, -0.2, 1.5] {
            let result = stratified_split_indices(&y, bad, Some(1));
            assert!(matches!(
                result,
                Err(DetectarError::InvalidHyperparameter { .. })
            ));
        }
    }

    #[test]
    fn test_empty_labels() {
        let result = stratified_split_indices(&[], 0.3, Some(1));
        assert!(matches!(result, Err(DetectarError::EmptyInput { .. })));
    }

    #[test]
    fn test_length_mismatch() {
        let x = feature_ramp(4);
        let result = stratified_train_test_split(&x, &[0, 1, 0], 0.3, Some(1));
        assert!(matches!(result, Err(DetectarError::LengthMismatch { .. })));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn train_fraction_tracks_global_fraction(
                n0 in 10usize..120,
                n1 in 5usize..60,
                seed in 0u64..1000,
            ) {
                let y = imbalanced_labels(n0, n1);
                let (train, _) = stratified_split_indices(&y, 0.3, Some(seed)).expect("valid split");

                let global = n1 as f32 / (n0 + n1) as f32;
                let in_train = train.iter().filter(|&&i| y[i] == 1).count() as f32;
                let train_frac = in_train / train.len() as f32;
                prop_assert!((train_frac - global).abs() < 1.0 / train.len() as f32);
            }
        }
    }
}
