//! Seeded k-fold cross-validation.
//!
//! Rows are shuffled once with `StdRng::seed_from_u64(seed)` and row
//! `perm[i]` goes to fold `i mod k`. Each fold is held out in turn, the
//! schema is refitted on the rest (polynomial bases included) and the mean
//! squared prediction error on the held-out rows is recorded. Folds run in
//! parallel; results are reduced in fold order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::regression::{fit, FittedModel};
use crate::error::{Error, Result};
use crate::schema::CovariateSchema;
use crate::table::ObservationTable;

pub const DEFAULT_FOLDS: usize = 10;
pub const DEFAULT_SEED: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvConfig {
    pub folds: usize,
    pub seed: u64,
}

impl Default for CvConfig {
    fn default() -> Self {
        CvConfig {
            folds: DEFAULT_FOLDS,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldResult {
    pub fold: usize,
    pub n_test: usize,
    pub mse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CvReport {
    pub folds: usize,
    pub seed: u64,
    pub fold_results: Vec<FoldResult>,
    /// Σ (n_k/n)·mse_k
    pub raw_error: f64,
    /// Raw error corrected for the optimism of fitting on n − n_k rows
    pub adjusted_error: f64,
    pub rmse: f64,
}

/// Fold index of every row
pub fn fold_assignment(n: usize, folds: usize, seed: u64) -> Result<Vec<usize>> {
    if folds < 2 || folds > n {
        return Err(Error::Config(format!(
            "cross-validation needs 2 <= folds <= rows, got {} folds for {} rows",
            folds, n
        )));
    }
    let mut perm: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    perm.shuffle(&mut rng);

    let mut assignment = vec![0; n];
    for (i, &row) in perm.iter().enumerate() {
        assignment[row] = i % folds;
    }
    Ok(assignment)
}

fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    sum / actual.len() as f64
}

struct FoldOutcome {
    result: FoldResult,
    /// MSE of the fold model over every row
    mse_all: f64,
}

fn run_fold(
    table: &ObservationTable,
    schema: &CovariateSchema,
    assignment: &[usize],
    fold: usize,
    y: &[f64],
) -> Result<FoldOutcome> {
    let (test, train): (Vec<usize>, Vec<usize>) =
        (0..table.len()).partition(|&i| assignment[i] == fold);

    let model = fit(&table.select_rows(&train), schema)?;
    let predicted = model.predict(table)?;
    let test_actual: Vec<f64> = test.iter().map(|&i| y[i]).collect();
    let test_predicted: Vec<f64> = test.iter().map(|&i| predicted[i]).collect();

    let result = FoldResult {
        fold,
        n_test: test.len(),
        mse: mse(&test_actual, &test_predicted),
    };
    log::debug!(
        "fold {}: {} train, {} test, mse={:.6}",
        fold,
        train.len(),
        result.n_test,
        result.mse
    );
    Ok(FoldOutcome {
        result,
        mse_all: mse(y, &predicted),
    })
}

/// Cross-validate `schema` on `table`.
///
/// `full` is the model fitted on all of `table`; its in-sample MSE enters
/// the bias adjustment.
pub fn cross_validate(
    table: &ObservationTable,
    schema: &CovariateSchema,
    full: &FittedModel,
    config: &CvConfig,
) -> Result<CvReport> {
    let n = table.len();
    let assignment = fold_assignment(n, config.folds, config.seed)?;
    let y = table.dependent_values()?;

    let outcomes = (0..config.folds)
        .into_par_iter()
        .map(|fold| run_fold(table, schema, &assignment, fold, &y))
        .collect::<Result<Vec<_>>>()?;

    let nf = n as f64;
    let raw_error: f64 = outcomes
        .iter()
        .map(|o| o.result.n_test as f64 / nf * o.result.mse)
        .sum();
    let weighted_all: f64 = outcomes
        .iter()
        .map(|o| o.result.n_test as f64 / nf * o.mse_all)
        .sum();
    let full_mse = full.diagnostics().rss / nf;
    let adjusted_error = raw_error + full_mse - weighted_all;

    log::info!(
        "{}-fold CV: raw error {:.6}, adjusted {:.6}",
        config.folds,
        raw_error,
        adjusted_error
    );
    Ok(CvReport {
        folds: config.folds,
        seed: config.seed,
        fold_results: outcomes.into_iter().map(|o| o.result).collect(),
        raw_error,
        adjusted_error,
        rmse: raw_error.sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::na::NA;
    use crate::table::Column;
    use chrono::NaiveDate;

    fn table(n: usize) -> ObservationTable {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let dates = (0..n as u64).map(|i| start + chrono::Days::new(i)).collect();
        let x: Vec<f64> = (0..n).map(|i| i as f64 * 0.3).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 2.0 + 1.5 * v + ((i * 17 % 7) as f64 - 3.0) * 0.1)
            .collect();
        ObservationTable::new(
            dates,
            vec![
                Column::new("y", y.into_iter().map(NA::Value).collect()),
                Column::new("x", x.into_iter().map(NA::Value).collect()),
            ],
            "y",
        )
        .unwrap()
    }

    #[test]
    fn test_every_row_held_out_once() {
        let assignment = fold_assignment(23, 5, 7).unwrap();
        let mut counts = vec![0; 5];
        for &f in &assignment {
            counts[f] += 1;
        }
        assert_eq!(counts.iter().sum::<usize>(), 23);
        assert!(counts.iter().all(|&c| c == 4 || c == 5));
    }

    #[test]
    fn test_assignment_is_seeded() {
        assert_eq!(
            fold_assignment(50, 10, 99).unwrap(),
            fold_assignment(50, 10, 99).unwrap()
        );
        assert_ne!(
            fold_assignment(50, 10, 99).unwrap(),
            fold_assignment(50, 10, 100).unwrap()
        );
    }

    #[test]
    fn test_invalid_fold_counts() {
        assert!(matches!(fold_assignment(10, 1, 0), Err(Error::Config(_))));
        assert!(matches!(fold_assignment(10, 11, 0), Err(Error::Config(_))));
        assert!(fold_assignment(10, 10, 0).is_ok());
    }

    #[test]
    fn test_cross_validate() {
        let t = table(40);
        let schema = CovariateSchema::linear(&["x"]).unwrap();
        let full = fit(&t, &schema).unwrap();
        let report = cross_validate(&t, &schema, &full, &CvConfig::default()).unwrap();

        assert_eq!(report.fold_results.len(), 10);
        assert_eq!(report.fold_results.iter().map(|f| f.n_test).sum::<usize>(), 40);
        assert!(report.fold_results.iter().enumerate().all(|(i, f)| f.fold == i));
        assert!(report.raw_error > 0.0);
        assert!((report.rmse - report.raw_error.sqrt()).abs() < 1e-15);
        // Out-of-sample error exceeds the in-sample error
        assert!(report.raw_error > full.diagnostics().rss / 40.0);

        let again = cross_validate(&t, &schema, &full, &CvConfig::default()).unwrap();
        assert_eq!(report, again);
    }
}
