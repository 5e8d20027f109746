//! End-to-end pipeline scenario tests.
//!
//! Exercises the full clean/balance/split/evaluate sequence on a small
//! synthetic fraud table and verifies that a fixed seed makes the whole
//! run reproducible.

use detectar::prelude::*;

/// 10 transactions, 8 legitimate and 2 fraudulent, with one row whose
/// label cell is missing.
fn synthetic_transactions() -> Dataset {
    let amounts: Vec<Option<f32>> = [
        12.0, 15.5, 9.9, 30.0, 22.1, 18.4, 27.3, 11.0, 480.0, 515.0, 44.0,
    ]
    .iter()
    .map(|&v| Some(v))
    .collect();
    let labels = vec![
        Some(0.0),
        Some(0.0),
        Some(0.0),
        Some(0.0),
        Some(0.0),
        Some(0.0),
        Some(0.0),
        Some(0.0),
        Some(1.0),
        Some(1.0),
        None,
    ];
    Dataset::from_columns(
        vec![
            ("amount".to_string(), amounts),
            ("Target".to_string(), labels),
        ],
        "Target",
    )
    .expect("columns share one length")
}

/// Ignores the features entirely and always predicts the class that
/// dominated training.
struct MajorityBackend {
    majority: Option<usize>,
}

impl ModelBackend for MajorityBackend {
    fn name(&self) -> &str {
        "majority"
    }

    fn fit(&mut self, _x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        if y.is_empty() {
            return Err(DetectarError::empty_input("majority training data"));
        }
        let ones = y.iter().filter(|&&label| label == 1).count();
        self.majority = Some(usize::from(ones * 2 > y.len()));
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Prediction> {
        let majority = self.majority.ok_or("majority backend not trained yet")?;
        Ok(Prediction::Labels(vec![majority; x.n_rows()]))
    }
}

fn config() -> PipelineConfig {
    PipelineConfig::new().with_smote_neighbors(1)
}

#[test]
fn cleaning_then_balance_then_split_shapes() {
    let report = Pipeline::new(config())
        .run_with_backends(
            &synthetic_transactions(),
            vec![Box::new(MajorityBackend { majority: None })],
        )
        .expect("pipeline succeeds");

    // The unlabeled row drops, 8 + 2 rows balance to 8 + 8, and
    // round(0.3 * 8) = 2 per class go to test.
    assert_eq!(report.missing.for_column("Target"), Some(1));
    assert_eq!(report.balanced_rows, 16);
    assert_eq!(report.train_rows, 12);
    assert_eq!(report.test_rows, 4);
}

#[test]
fn majority_backend_scores_half_on_balanced_test_set() {
    let report = Pipeline::new(config())
        .run_with_backends(
            &synthetic_transactions(),
            vec![Box::new(MajorityBackend { majority: None })],
        )
        .expect("pipeline succeeds");

    // Balanced training data has no majority, so the dummy backend
    // predicts 0 for all 4 test rows (2 of each class).
    let result = &report.results["majority"];
    assert!((result.accuracy - 0.5).abs() < f32::EPSILON);
    assert_eq!(result.confusion.get(0, 0), 2);
    assert_eq!(result.confusion.get(1, 0), 2);
    assert_eq!(result.per_class[&1].recall, 0.0);
    assert_eq!(result.per_class[&1].support, 2);
}

#[test]
fn same_seed_reproduces_the_evaluation() {
    let dataset = synthetic_transactions();
    let pipeline = Pipeline::new(config());

    let first = pipeline
        .run_with_backends(&dataset, vec![Box::new(MajorityBackend { majority: None })])
        .expect("pipeline succeeds");
    let second = pipeline
        .run_with_backends(&dataset, vec![Box::new(MajorityBackend { majority: None })])
        .expect("pipeline succeeds");

    assert_eq!(first.results["majority"], second.results["majority"]);
    assert_eq!(first.balanced_rows, second.balanced_rows);
}

#[test]
fn registered_backends_all_report_on_separable_data() {
    let report = Pipeline::new(config())
        .run(&synthetic_transactions())
        .expect("pipeline succeeds");

    assert!(
        report.failures.is_empty(),
        "unexpected failures: {:?}",
        report.failures
    );
    for kind in BackendKind::ALL {
        let result = &report.results[kind.name()];
        assert_eq!(result.confusion.n_rows(), 2);
        assert_eq!(
            result.per_class[&0].support + result.per_class[&1].support,
            report.test_rows
        );
    }
}

#[test]
fn seeded_full_registry_is_reproducible() {
    let dataset = synthetic_transactions();
    let pipeline = Pipeline::new(config());

    let first = pipeline.run(&dataset).expect("pipeline succeeds");
    let second = pipeline.run(&dataset).expect("pipeline succeeds");

    for kind in BackendKind::ALL {
        assert_eq!(
            first.results[kind.name()],
            second.results[kind.name()],
            "{} diverged between identical runs",
            kind.name()
        );
    }
}
