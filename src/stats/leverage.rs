//! High-leverage row filtering.
//!
//! The leverage of row i is the i-th diagonal of the hat matrix
//! H = X(XᵀX)⁻¹Xᵀ, computed as the squared norm of row i of the thin Q
//! factor of X. Rows with leverage at or above 2p/n are excluded, once.

use chrono::NaiveDate;
use serde::Serialize;

use super::regression::{least_squares, FittedModel};
use crate::error::{Error, Result};
use crate::table::ObservationTable;
use nalgebra::DVector;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeverageReport {
    /// Hat diagonal per row of the table it was computed on
    pub leverage: Vec<f64>,
    /// 2p/n
    pub threshold: f64,
    pub kept: Vec<usize>,
    pub excluded: Vec<usize>,
    pub excluded_dates: Vec<NaiveDate>,
}

impl LeverageReport {
    pub fn n_kept(&self) -> usize {
        self.kept.len()
    }

    pub fn n_excluded(&self) -> usize {
        self.excluded.len()
    }
}

/// Row indices below `threshold` and at or above it, in that order
fn split_by_threshold(leverage: &[f64], threshold: f64) -> (Vec<usize>, Vec<usize>) {
    let (excluded, kept): (Vec<usize>, Vec<usize>) =
        (0..leverage.len()).partition(|&i| leverage[i] >= threshold);
    (kept, excluded)
}

/// Leverage of every row of `table` under `model`'s design.
pub fn leverage(model: &FittedModel, table: &ObservationTable) -> Result<LeverageReport> {
    let x = model.design_matrix(table)?;
    let (n, p) = x.shape();
    if n == 0 {
        return Err(Error::Shape("cannot compute leverage on an empty table".to_string()));
    }

    let y = DVector::from_vec(table.dependent_values()?);
    let q = least_squares(&x, &y)
        .map_err(|e| match e {
            Error::Numeric { message, .. } => Error::numeric("leverage", message),
            other => other,
        })?
        .q;
    let leverage: Vec<f64> = q.row_iter().map(|row| row.norm_squared()).collect();
    let threshold = 2.0 * p as f64 / n as f64;

    let (kept, excluded) = split_by_threshold(&leverage, threshold);
    let excluded_dates = excluded.iter().map(|&i| table.dates()[i]).collect();

    log::info!(
        "leverage threshold {:.4}: excluding {} of {} rows",
        threshold,
        excluded.len(),
        n
    );
    Ok(LeverageReport {
        leverage,
        threshold,
        kept,
        excluded,
        excluded_dates,
    })
}

/// Rows of `table` kept by `report`.
pub fn filter(table: &ObservationTable, report: &LeverageReport) -> Result<ObservationTable> {
    if report.leverage.len() != table.len() {
        return Err(Error::Shape(format!(
            "leverage computed for {} rows, table has {}",
            report.leverage.len(),
            table.len()
        )));
    }
    Ok(table.select_rows(&report.kept))
}
