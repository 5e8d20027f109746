//! Classification metrics for evaluating predictions against ground truth.

use crate::error::{DetectarError, Result};
use crate::primitives::Matrix;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Per-class metrics: precision, recall, F1, support.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    /// TP / (TP + FP); 0.0 when the class was never predicted.
    pub precision: f32,
    /// TP / (TP + FN); 0.0 when the class has no true instances.
    pub recall: f32,
    /// Harmonic mean of precision and recall; 0.0 when both are 0.
    pub f1: f32,
    /// Count of true instances of the class.
    pub support: usize,
}

/// The full evaluation of one prediction run.
///
/// Immutable once computed; one per backend run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    /// Fraction of correct predictions.
    pub accuracy: f32,
    /// `confusion[i][j]` = count of samples with true class i, predicted class j.
    pub confusion: Matrix<usize>,
    /// Metrics per class label, in label order.
    pub per_class: BTreeMap<usize, ClassMetrics>,
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>8}  {:>9}  {:>6}  {:>6}  {:>7}",
            "class", "precision", "recall", "f1", "support"
        )?;
        for (label, m) in &self.per_class {
            writeln!(
                f,
                "{label:>8}  {:>9.3}  {:>6.3}  {:>6.3}  {:>7}",
                m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f, "accuracy: {:.4}", self.accuracy)?;
        writeln!(f, "confusion matrix (rows = true, cols = predicted):")?;
        let n = self.confusion.n_rows();
        for i in 0..n {
            write!(f, "  [")?;
            for j in 0..n {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self.confusion.get(i, j))?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

/// Evaluates predicted labels against ground truth.
///
/// Division-by-zero cases (a class never predicted, or absent from the
/// truth) yield 0.0 for the affected metric rather than NaN.
///
/// # Errors
///
/// Returns `LengthMismatch` if the sequences differ in length and
/// `EmptyInput` if they are empty.
///
/// # Examples
///
/// ```
/// use detectar::metrics::evaluate;
///
/// let result = evaluate(&[0, 0, 1, 1], &[0, 1, 1, 1]).expect("aligned inputs");
/// assert!((result.accuracy - 0.75).abs() < f32::EPSILON);
/// assert_eq!(result.confusion.get(0, 1), 1);
/// ```
pub fn evaluate(y_true: &[usize], y_pred: &[usize]) -> Result<EvaluationResult> {
    if y_true.len() != y_pred.len() {
        return Err(DetectarError::LengthMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(DetectarError::empty_input(
            "evaluation requires at least one sample",
        ));
    }

    let n_classes = y_true
        .iter()
        .chain(y_pred.iter())
        .max()
        .map_or(0, |&m| m + 1)
        .max(2);

    let mut confusion_data = vec![0usize; n_classes * n_classes];
    let mut correct = 0usize;
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        confusion_data[t * n_classes + p] += 1;
        if t == p {
            correct += 1;
        }
    }
    let confusion = Matrix::from_vec(n_classes, n_classes, confusion_data)
        .map_err(|e| DetectarError::Other(e.to_string()))?;

    let mut per_class = BTreeMap::new();
    for class in 0..n_classes {
        let tp = confusion.get(class, class);
        let fp: usize = (0..n_classes)
            .filter(|&i| i != class)
            .map(|i| confusion.get(i, class))
            .sum();
        let fn_count: usize = (0..n_classes)
            .filter(|&j| j != class)
            .map(|j| confusion.get(class, j))
            .sum();
        let support = tp + fn_count;

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_count);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        per_class.insert(
            class,
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            },
        );
    }

    Ok(EvaluationResult {
        accuracy: correct as f32 / y_true.len() as f32,
        confusion,
        per_class,
    })
}

fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}
