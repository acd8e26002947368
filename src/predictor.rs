//! Baseline salary predictor: ordinary least squares over integer-coded
//! categorical features.

use std::collections::BTreeSet;
use std::fmt;

use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;

use crate::data::columns::{EXPERIENCE_LEVEL, JOB_TYPE};
use crate::data::model::{Column, ColumnKind, Dataset, Value};
use crate::data::stats::median;

pub const SPLIT_SEED: u64 = 42;
pub const TEST_FRACTION: f64 = 0.2;

/// Relative residual norm under which a feature column counts as dependent.
const RANK_TOLERANCE: f64 = 1e-8;

/// Feature columns and the names their codes are reported under.
const FEATURES: [(&str, &str); 2] = [(EXPERIENCE_LEVEL, "exp_code"), (JOB_TYPE, "jobtype_code")];

/// Error metrics of one fit. MAE and MSE are measured on the held-out
/// split; R² is measured on the training split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub mae: f64,
    pub mse: f64,
    pub r2_train: f64,
    pub features: Vec<String>,
    /// Features left out of the fit because they were constant or a linear
    /// combination of earlier ones on the training split.
    pub dropped_features: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Result of a training request. Never an `Err`: failures are reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainOutcome {
    Trained(Metrics),
    NotEnoughFeatures,
    Failed { message: String },
}

impl fmt::Display for TrainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainOutcome::Trained(m) => {
                writeln!(f, "MAE: {}", m.mae)?;
                writeln!(f, "MSE: {}", m.mse)?;
                write!(f, "R2 (train): {}", m.r2_train)
            }
            TrainOutcome::NotEnoughFeatures => write!(f, "Not enough features to train the model."),
            TrainOutcome::Failed { message } => write!(f, "Error: {message}"),
        }
    }
}

#[derive(Error, Debug)]
enum PredictError {
    #[error("target column {0} not found")]
    MissingTarget(String),

    #[error("target column {0} is not numeric")]
    NonNumericTarget(String),

    #[error("target column {0} has no values")]
    EmptyTarget(String),

    #[error("need at least 2 rows to split, got {0}")]
    TooFewRows(usize),

    #[error("fit failed: {0}")]
    Fit(#[from] linfa_linear::LinearError<f64>),

    #[error("metric failed: {0}")]
    Metric(#[from] linfa::Error),
}

/// Train the baseline on the unfiltered dataset and report its metrics.
pub fn train_baseline(dataset: &Dataset, salary_column: &str) -> TrainOutcome {
    let encoded: Vec<(&str, Vec<f64>)> = FEATURES
        .iter()
        .filter_map(|(column, code)| Some((*code, category_codes(dataset.column(column)?))))
        .collect();

    if encoded.is_empty() {
        log::warn!("No categorical features available; skipping model training");
        return TrainOutcome::NotEnoughFeatures;
    }

    match fit(dataset, salary_column, &encoded) {
        Ok(metrics) => {
            log::info!(
                "Trained baseline on {} rows: MAE={:.2} MSE={:.2} R2(train)={:.4}",
                metrics.train_rows,
                metrics.mae,
                metrics.mse,
                metrics.r2_train
            );
            TrainOutcome::Trained(metrics)
        }
        Err(e) => {
            log::error!("Baseline training failed: {e}");
            TrainOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}

/// Index of each cell in the sorted distinct non-null values. Missing
/// cells are coded 0.
pub fn category_codes(column: &Column) -> Vec<f64> {
    let categories: Vec<&Value> = column
        .cells
        .iter()
        .filter(|v| !v.is_null())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    column
        .cells
        .iter()
        .map(|v| {
            if v.is_null() {
                0.0
            } else {
                categories.binary_search(&v).map_or(0.0, |i| i as f64)
            }
        })
        .collect()
}

/// Target cells with nulls replaced by the median.
fn target_values(dataset: &Dataset, salary_column: &str) -> Result<Vec<f64>, PredictError> {
    let column = dataset
        .column(salary_column)
        .ok_or_else(|| PredictError::MissingTarget(salary_column.to_string()))?;
    if column.kind != ColumnKind::Numeric {
        return Err(PredictError::NonNumericTarget(salary_column.to_string()));
    }
    let fill = median(&column.numeric_values())
        .ok_or_else(|| PredictError::EmptyTarget(salary_column.to_string()))?;
    Ok(column.cells.iter().map(|v| v.as_f64().unwrap_or(fill)).collect())
}

/// Shuffled row indices split into (train, test). The test part has
/// `ceil(n * TEST_FRACTION)` rows.
pub fn train_test_split(n: usize, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(&mut StdRng::seed_from_u64(seed));
    let n_test = (n as f64 * TEST_FRACTION).ceil() as usize;
    let train = idx.split_off(n_test.min(n));
    (train, idx)
}

fn fit(
    dataset: &Dataset,
    salary_column: &str,
    encoded: &[(&str, Vec<f64>)],
) -> Result<Metrics, PredictError> {
    let target = target_values(dataset, salary_column)?;
    let n = target.len();
    if n < 2 {
        return Err(PredictError::TooFewRows(n));
    }

    let records = Array2::from_shape_fn((n, encoded.len()), |(row, col)| encoded[col].1[row]);
    let targets = Array1::from(target);

    let (train_idx, test_idx) = train_test_split(n, SPLIT_SEED);
    let x_train = records.select(Axis(0), &train_idx);
    let y_train = targets.select(Axis(0), &train_idx);
    let x_test = records.select(Axis(0), &test_idx);
    let y_test = targets.select(Axis(0), &test_idx);

    let kept = independent_columns(&x_train);
    let (train_pred, test_pred) = if kept.is_empty() {
        // Intercept only: the training mean.
        let mean = y_train.mean().ok_or(PredictError::TooFewRows(0))?;
        (
            Array1::from_elem(y_train.len(), mean),
            Array1::from_elem(y_test.len(), mean),
        )
    } else {
        let x_train = x_train.select(Axis(1), &kept);
        let x_test = x_test.select(Axis(1), &kept);
        let model = LinearRegression::default()
            .fit(&linfa::Dataset::new(x_train.clone(), y_train.clone()))?;
        (model.predict(&x_train), model.predict(&x_test))
    };

    Ok(Metrics {
        mae: test_pred.mean_absolute_error(&y_test)?,
        mse: test_pred.mean_squared_error(&y_test)?,
        r2_train: train_pred.r2(&y_train)?,
        features: encoded.iter().map(|(name, _)| name.to_string()).collect(),
        dropped_features: (0..encoded.len())
            .filter(|i| !kept.contains(i))
            .map(|i| encoded[i].0.to_string())
            .collect(),
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
    })
}

/// Indices of columns that are linearly independent of the intercept and of
/// the columns kept before them. Gram-Schmidt over the centred columns.
fn independent_columns(records: &Array2<f64>) -> Vec<usize> {
    let mut basis: Vec<Array1<f64>> = Vec::new();
    let mut kept = Vec::new();
    for (i, column) in records.axis_iter(Axis(1)).enumerate() {
        let mut residual = centred(column);
        let norm = residual.dot(&residual).sqrt();
        if norm == 0.0 {
            continue;
        }
        for b in &basis {
            let proj = residual.dot(b);
            residual.scaled_add(-proj, b);
        }
        let rest = residual.dot(&residual).sqrt();
        if rest <= RANK_TOLERANCE * norm {
            continue;
        }
        basis.push(residual / rest);
        kept.push(i);
    }
    kept
}

fn centred(column: ArrayView1<'_, f64>) -> Array1<f64> {
    let mean = column.mean().unwrap_or(0.0);
    column.mapv(|v| v - mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;

    #[test]
    fn salary_only_reports_not_enough_features() {
        let ds = parse_csv(b"salary_in_usd\n1\n2\n3\n").unwrap();
        assert_eq!(train_baseline(&ds, "salary_in_usd"), TrainOutcome::NotEnoughFeatures);
    }

    #[test]
    fn codes_follow_sorted_categories() {
        let ds = parse_csv(b"experience_level,salary\nSE,1\nEN,2\n,3\nMI,4\nSE,5\n").unwrap();
        let codes = category_codes(ds.column("experience_level").unwrap());
        assert_eq!(codes, vec![2.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn split_is_deterministic_and_sized() {
        let (train, test) = train_test_split(10, SPLIT_SEED);
        assert_eq!((train.len(), test.len()), (8, 2));
        assert_eq!(train_test_split(10, SPLIT_SEED), (train.clone(), test.clone()));

        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        let (train, test) = train_test_split(7, SPLIT_SEED);
        assert_eq!((train.len(), test.len()), (5, 2));
    }

    #[test]
    fn linear_salary_is_fit_exactly() {
        let mut csv = String::from("experience_level,salary_in_usd\n");
        for (level, salary) in [("EN", 50), ("MI", 70), ("SE", 90), ("ZZ", 110)] {
            for _ in 0..5 {
                csv.push_str(&format!("{level},{salary}\n"));
            }
        }
        let ds = parse_csv(csv.as_bytes()).unwrap();

        let TrainOutcome::Trained(m) = train_baseline(&ds, "salary_in_usd") else {
            panic!("expected a fit");
        };
        assert_eq!(m.features, vec!["exp_code"]);
        assert_eq!((m.train_rows, m.test_rows), (16, 4));
        assert!(m.mae < 1e-6, "mae = {}", m.mae);
        assert!(m.mse < 1e-6, "mse = {}", m.mse);
        assert!((m.r2_train - 1.0).abs() < 1e-6);
    }

    #[test]
    fn constant_feature_falls_back_to_the_training_mean() {
        let ds = parse_csv(b"experience_level,salary_in_usd\nSE,10\nSE,20\nSE,30\nSE,40\nSE,50\n")
            .unwrap();
        let TrainOutcome::Trained(m) = train_baseline(&ds, "salary_in_usd") else {
            panic!("expected a fit");
        };
        assert_eq!(m.dropped_features, vec!["exp_code"]);
        assert_eq!((m.train_rows, m.test_rows), (4, 1));
        assert!(m.r2_train.abs() < 1e-6, "r2 = {}", m.r2_train);
        assert!(m.mae.is_finite() && m.mse >= 0.0);
    }

    #[test]
    fn collinear_features_keep_the_first() {
        let mut csv = String::from("experience_level,job_type,salary_in_usd\n");
        for (level, job_type, salary) in [("EN", "A", 50), ("MI", "B", 70), ("SE", "C", 90)] {
            for _ in 0..5 {
                csv.push_str(&format!("{level},{job_type},{salary}\n"));
            }
        }
        let ds = parse_csv(csv.as_bytes()).unwrap();

        let TrainOutcome::Trained(m) = train_baseline(&ds, "salary_in_usd") else {
            panic!("expected a fit");
        };
        assert_eq!(m.features, vec!["exp_code", "jobtype_code"]);
        assert_eq!(m.dropped_features, vec!["jobtype_code"]);
        assert!(m.mae < 1e-6, "mae = {}", m.mae);
    }

    #[test]
    fn two_rows_still_train() {
        let ds = parse_csv(b"experience_level,salary_in_usd\nSE,10\nEN,20\n").unwrap();
        let TrainOutcome::Trained(m) = train_baseline(&ds, "salary_in_usd") else {
            panic!("expected a fit");
        };
        assert_eq!((m.train_rows, m.test_rows), (1, 1));
        assert_eq!(m.dropped_features, vec!["exp_code"]);
    }

    #[test]
    fn missing_target_values_use_median() {
        let ds = parse_csv(b"experience_level,salary\nSE,10\nEN,\nMI,30\n").unwrap();
        assert_eq!(target_values(&ds, "salary").unwrap(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn text_target_fails_without_panicking() {
        let ds = parse_csv(b"experience_level,salary\nSE,high\nEN,low\nMI,mid\n").unwrap();
        let outcome = train_baseline(&ds, "salary");
        assert!(matches!(outcome, TrainOutcome::Failed { .. }));
        assert!(outcome.to_string().starts_with("Error: "));
    }
}
