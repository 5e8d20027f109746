//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use detectar::prelude::*;
//! ```

pub use crate::backend::{BackendKind, ModelBackend, Prediction};
pub use crate::dataset::{Dataset, MissingReport};
pub use crate::error::{DetectarError, Result};
pub use crate::metrics::{evaluate, EvaluationResult};
pub use crate::model_selection::{stratified_train_test_split, TrainTestSplit};
pub use crate::pipeline::{Pipeline, PipelineConfig, RunReport};
pub use crate::preprocessing::{Binarizer, Smote};
pub use crate::primitives::{Matrix, Vector};
