//! Best-subset search over design columns.
//!
//! For each subset size the subset with the smallest residual sum of squares
//! is kept, and adjusted R², BIC and Mallows' Cp are reported for it. Every
//! subset carries the intercept. The search is exhaustive up to
//! [`EXHAUSTIVE_LIMIT`] candidate columns and forward stepwise beyond that.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use super::{least_squares, schema_design};
use crate::error::{Error, Result};
use crate::schema::CovariateSchema;
use crate::table::ObservationTable;

/// Largest candidate count searched exhaustively
pub const EXHAUSTIVE_LIMIT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Exhaustive,
    Forward,
}

/// Best subset of one size
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsetRow {
    pub size: usize,
    pub columns: Vec<String>,
    pub rss: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub bic: f64,
    pub cp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsetReport {
    pub method: SearchMethod,
    pub candidates: Vec<String>,
    pub rows: Vec<SubsetRow>,
    /// Subset sizes preferred by each criterion
    pub best_adj_r_squared: usize,
    pub best_bic: usize,
    pub best_cp: usize,
}

struct Search<'a> {
    x: &'a DMatrix<f64>,
    y: &'a DVector<f64>,
}

impl Search<'_> {
    /// RSS with the intercept plus the given candidate columns; `None` if rank deficient
    fn rss(&self, cols: &[usize]) -> Option<f64> {
        let n = self.x.nrows();
        let design = DMatrix::from_fn(n, cols.len() + 1, |i, j| {
            if j == 0 {
                1.0
            } else {
                self.x[(i, cols[j - 1] + 1)]
            }
        });
        least_squares(&design, self.y).ok().map(|s| s.rss(self.y))
    }

    fn exhaustive(&self, m: usize, size: usize) -> Option<(Vec<usize>, f64)> {
        let mut best: Option<(Vec<usize>, f64)> = None;
        let mut combo: Vec<usize> = (0..size).collect();
        loop {
            if let Some(rss) = self.rss(&combo) {
                if best.as_ref().map_or(true, |(_, b)| rss < *b) {
                    best = Some((combo.clone(), rss));
                }
            }
            // Advance to the next combination in lexicographic order
            let mut i = size;
            loop {
                if i == 0 {
                    return best;
                }
                i -= 1;
                if combo[i] < m - size + i {
                    break;
                }
            }
            combo[i] += 1;
            for j in i + 1..size {
                combo[j] = combo[j - 1] + 1;
            }
        }
    }

    fn forward(&self, m: usize, max_size: usize) -> Vec<(Vec<usize>, f64)> {
        let mut chosen: Vec<usize> = Vec::new();
        let mut path = Vec::new();
        for _ in 0..max_size {
            let mut best: Option<(usize, f64)> = None;
            for candidate in (0..m).filter(|c| !chosen.contains(c)) {
                let mut cols = chosen.clone();
                cols.push(candidate);
                if let Some(rss) = self.rss(&cols) {
                    if best.map_or(true, |(_, b)| rss < b) {
                        best = Some((candidate, rss));
                    }
                }
            }
            match best {
                Some((candidate, rss)) => {
                    chosen.push(candidate);
                    path.push((chosen.clone(), rss));
                }
                None => break,
            }
        }
        path
    }
}

fn argmax_size(rows: &[SubsetRow], key: impl Fn(&SubsetRow) -> f64) -> usize {
    rows.iter()
        .fold(None::<&SubsetRow>, |best, row| match best {
            Some(b) if key(b) >= key(row) => Some(b),
            _ => Some(row),
        })
        .map_or(0, |r| r.size)
}

/// Search subsets of the schema's expanded design columns up to `max_size`.
pub fn best_subsets(
    table: &ObservationTable,
    schema: &CovariateSchema,
    max_size: usize,
) -> Result<SubsetReport> {
    if max_size == 0 {
        return Err(Error::Config("best-subset size must be at least 1".to_string()));
    }
    let x = schema_design(schema, table)?;
    let y = DVector::from_vec(table.dependent_values()?);
    let candidates: Vec<String> = schema.terms().iter().flat_map(|t| t.column_labels()).collect();

    let n = x.nrows();
    let m = candidates.len();
    if n <= m + 1 {
        return Err(Error::numeric(
            "best subset",
            format!("{} rows cannot support the full model of {} columns", n, m),
        ));
    }

    let full = least_squares(&x, &y)?;
    let sigma2_full = full.rss(&y) / (n - m - 1) as f64;
    let mean = y.mean();
    let tss = y.iter().map(|v| (v - mean).powi(2)).sum::<f64>();

    let search = Search { x: &x, y: &y };
    let max_size = max_size.min(m);
    let (method, found): (SearchMethod, Vec<(Vec<usize>, f64)>) = if m <= EXHAUSTIVE_LIMIT {
        let found = (1..=max_size)
            .filter_map(|size| search.exhaustive(m, size))
            .collect();
        (SearchMethod::Exhaustive, found)
    } else {
        (SearchMethod::Forward, search.forward(m, max_size))
    };

    let nf = n as f64;
    let rows: Vec<SubsetRow> = found
        .into_iter()
        .map(|(cols, rss)| {
            let size = cols.len();
            let r_squared = 1.0 - rss / tss;
            SubsetRow {
                size,
                columns: cols.iter().map(|&c| candidates[c].clone()).collect(),
                rss,
                r_squared,
                adj_r_squared: 1.0 - (1.0 - r_squared) * (nf - 1.0) / (nf - size as f64 - 1.0),
                bic: nf * (rss / nf).ln() + nf.ln() * (size + 1) as f64,
                cp: rss / sigma2_full + 2.0 * (size + 1) as f64 - nf,
            }
        })
        .collect();

    let report = SubsetReport {
        method,
        best_adj_r_squared: argmax_size(&rows, |r| r.adj_r_squared),
        best_bic: argmax_size(&rows, |r| -r.bic),
        best_cp: argmax_size(&rows, |r| -r.cp),
        candidates,
        rows,
    };
    log::info!(
        "best-subset search ({:?}) over {} columns: adj R² prefers size {}, BIC size {}, Cp size {}",
        report.method,
        m,
        report.best_adj_r_squared,
        report.best_bic,
        report.best_cp
    );
    Ok(report)
}
