//! Evaluation metrics for classifier comparison.
//!
//! Accuracy, confusion matrix, and per-class precision/recall/F1/support,
//! collected into one [`EvaluationResult`] per backend run.

mod classification;

pub use classification::{evaluate, ClassMetrics, EvaluationResult};
