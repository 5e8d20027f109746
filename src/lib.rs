//! Detectar: fraud-detection model evaluation pipeline in pure Rust.
//!
//! Detectar loads an imbalanced transaction table, oversamples the
//! minority class, splits the data with stratification, then trains and
//! scores a set of tree-based classifiers side by side over one frozen
//! split.
//!
//! # Quick Start
//!
//! ```
//! use detectar::prelude::*;
//!
//! // Two feature clusters, 8 legitimate rows and 2 fraudulent ones.
//! let amounts: Vec<Option<f32>> = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 1.2, 1.4, 9.0, 9.5]
//!     .iter()
//!     .map(|&v| Some(v))
//!     .collect();
//! let labels: Vec<Option<f32>> = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]
//!     .iter()
//!     .map(|&v| Some(v))
//!     .collect();
//! let dataset = Dataset::from_columns(
//!     vec![("amount".to_string(), amounts), ("Target".to_string(), labels)],
//!     "Target",
//! )
//! .unwrap();
//!
//! let config = PipelineConfig::new().with_smote_neighbors(1);
//! let report = Pipeline::new(config).run(&dataset).unwrap();
//! assert_eq!(report.balanced_rows, 16);
//! assert!(report.failures.is_empty());
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`dataset`]: Delimited-file loading, type inference, cleaning
//! - [`preprocessing`]: Minority oversampling and probability thresholding
//! - [`model_selection`]: Stratified train/test splitting
//! - [`tree`]: Decision trees and the tree ensembles behind each backend
//! - [`backend`]: The train/predict contract and the backend registry
//! - [`metrics`]: Accuracy, confusion matrix, per-class scores
//! - [`pipeline`]: The orchestrated clean/balance/split/evaluate run

pub mod backend;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod model_selection;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod tree;
