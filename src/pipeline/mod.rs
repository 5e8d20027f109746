//! End-to-end evaluation pipeline.
//!
//! Runs the fixed sequence clean, balance, split, then per backend
//! train/predict/threshold/evaluate, reusing one frozen split so the
//! backends stay comparable. A backend failure is caught at the backend
//! boundary and reported per backend; failures ahead of the split abort
//! the whole run.

use crate::backend::{BackendKind, ModelBackend, Prediction};
use crate::dataset::{Dataset, MissingReport};
use crate::error::{DetectarError, Result};
use crate::metrics::{evaluate, EvaluationResult};
use crate::model_selection::stratified_train_test_split;
use crate::preprocessing::{Binarizer, Smote};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pipeline configuration.
///
/// Deserializable so runs can be driven from a JSON config file; every
/// field has the documented default.
///
/// # Examples
///
/// ```
/// use detectar::pipeline::PipelineConfig;
///
/// let config: PipelineConfig = serde_json::from_str(
///     r#"{ "test_fraction": 0.25, "backends": ["random_forest"] }"#,
/// ).expect("valid config");
/// assert!((config.test_fraction - 0.25).abs() < f32::EPSILON);
/// assert_eq!(config.split_seed, 7);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the label column in the input table.
    pub label_column: String,
    /// Held-out fraction for the test partition.
    pub test_fraction: f32,
    /// Seed for every stochastic stage (resampling, split, bootstrap).
    pub split_seed: u64,
    /// Boundary applied to probabilistic predictions; inclusive on the
    /// positive side.
    pub decision_threshold: f32,
    /// Neighbor count for minority oversampling.
    pub smote_neighbors: usize,
    /// Backends to train and evaluate, in report order.
    pub backends: Vec<BackendKind>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label_column: "Target".to_string(),
            test_fraction: 0.3,
            split_seed: 7,
            decision_threshold: 0.5,
            smote_neighbors: 5,
            backends: BackendKind::ALL.to_vec(),
        }
    }
}

impl PipelineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the label column name.
    #[must_use]
    pub fn with_label_column(mut self, name: impl Into<String>) -> Self {
        self.label_column = name.into();
        self
    }

    /// Sets the held-out fraction.
    #[must_use]
    pub fn with_test_fraction(mut self, test_fraction: f32) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Sets the shared random seed.
    #[must_use]
    pub fn with_split_seed(mut self, split_seed: u64) -> Self {
        self.split_seed = split_seed;
        self
    }

    /// Sets the decision threshold for probabilistic backends.
    #[must_use]
    pub fn with_decision_threshold(mut self, decision_threshold: f32) -> Self {
        self.decision_threshold = decision_threshold;
        self
    }

    /// Sets the neighbor count for minority oversampling.
    #[must_use]
    pub fn with_smote_neighbors(mut self, smote_neighbors: usize) -> Self {
        self.smote_neighbors = smote_neighbors;
        self
    }

    /// Sets the backends to run.
    #[must_use]
    pub fn with_backends(mut self, backends: Vec<BackendKind>) -> Self {
        self.backends = backends;
        self
    }
}

/// The collected outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Per-column missing counts observed before cleaning.
    pub missing: MissingReport,
    /// Balanced row count fed into the split.
    pub balanced_rows: usize,
    /// Training partition size.
    pub train_rows: usize,
    /// Held-out partition size.
    pub test_rows: usize,
    /// One evaluation per backend that completed, keyed by backend name.
    pub results: BTreeMap<String, EvaluationResult>,
    /// Error text per backend that failed, keyed by backend name.
    pub failures: BTreeMap<String, String>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "missing values before cleaning: {}", self.missing.total())?;
        writeln!(
            f,
            "balanced rows: {} (train {}, test {})",
            self.balanced_rows, self.train_rows, self.test_rows
        )?;
        for (name, result) in &self.results {
            writeln!(f, "\n=== {name} ===")?;
            write!(f, "{result}")?;
        }
        for (name, message) in &self.failures {
            writeln!(f, "\n=== {name} (failed) ===")?;
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}

/// Drives the full evaluation sequence over a dataset.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline with the given configuration.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads a delimited file using the configured label column and runs
    /// the pipeline on it.
    ///
    /// # Errors
    ///
    /// Returns `SourceNotFound`/`Schema` for loading problems, plus every
    /// error of [`Pipeline::run`].
    pub fn run_csv<P: AsRef<std::path::Path>>(&self, path: P) -> Result<RunReport> {
        let dataset = Dataset::from_csv(path, &self.config.label_column)?;
        self.run(&dataset)
    }

    /// Runs the pipeline with the configured backend registry.
    ///
    /// # Errors
    ///
    /// Propagates any failure ahead of backend training: schema problems,
    /// insufficient minority samples, invalid split parameters. Backend
    /// failures do not abort the run; they land in
    /// [`RunReport::failures`].
    pub fn run(&self, dataset: &Dataset) -> Result<RunReport> {
        let backends: Vec<Box<dyn ModelBackend>> = self
            .config
            .backends
            .iter()
            .map(|kind| kind.create(self.config.split_seed))
            .collect();
        self.run_with_backends(dataset, backends)
    }

    /// Runs the pipeline with caller-supplied backends.
    ///
    /// The shared stages run exactly once; every backend trains on the
    /// same balanced split and never sees another backend's predictions.
    ///
    /// # Errors
    ///
    /// Same contract as [`Pipeline::run`].
    pub fn run_with_backends(
        &self,
        dataset: &Dataset,
        mut backends: Vec<Box<dyn ModelBackend>>,
    ) -> Result<RunReport> {
        let (clean, missing) = dataset.drop_missing_labels()?;
        let (x, y) = clean.to_features()?;

        let (x_balanced, y_balanced) = Smote::new()
            .with_k_neighbors(self.config.smote_neighbors)
            .with_random_state(self.config.split_seed)
            .fit_resample(&x, &y)?;

        let split = stratified_train_test_split(
            &x_balanced,
            &y_balanced,
            self.config.test_fraction,
            Some(self.config.split_seed),
        )?;

        let binarizer = Binarizer::new().with_threshold(self.config.decision_threshold);
        let mut results = BTreeMap::new();
        let mut failures = BTreeMap::new();

        for backend in &mut backends {
            let name = backend.name().to_string();
            match Self::run_backend(backend.as_mut(), &split, &binarizer) {
                Ok(result) => {
                    results.insert(name, result);
                }
                Err(err) => {
                    let wrapped = DetectarError::BackendTraining {
                        backend: name.clone(),
                        message: err.to_string(),
                    };
                    failures.insert(name, wrapped.to_string());
                }
            }
        }

        Ok(RunReport {
            missing,
            balanced_rows: y_balanced.len(),
            train_rows: split.y_train.len(),
            test_rows: split.y_test.len(),
            results,
            failures,
        })
    }

    fn run_backend(
        backend: &mut dyn ModelBackend,
        split: &crate::model_selection::TrainTestSplit,
        binarizer: &Binarizer,
    ) -> Result<EvaluationResult> {
        backend.fit(&split.x_train, &split.y_train)?;

        let labels = match backend.predict(&split.x_test)? {
            Prediction::Labels(labels) => labels,
            Prediction::Probabilities(probas) => binarizer.transform(&probas),
        };

        evaluate(&split.y_test, &labels)
    }
}
