//! Variance inflation factors.
//!
//! For a term spanning several design columns (a polynomial basis) the
//! generalised VIF of Fox & Monette is reported:
//!
//! GVIF = det(R₁₁) · det(R₂₂) / det(R)
//!
//! where R is the correlation matrix of the non-intercept design columns,
//! R₁₁ the block of the term's own columns and R₂₂ the block of the rest.
//! For a single-column term it equals the classic 1 / (1 − R²ⱼ).
//!
//! With Z the centred, unit-norm design columns, R = ZᵀZ, so every
//! determinant is the squared product of the diagonal of a QR factor of the
//! matching columns of Z. Working in logs on those diagonals keeps nearly
//! collinear designs finite; only a diagonal that vanishes relative to the
//! largest one (the regression's own rank rule) is an error.

use nalgebra::DMatrix;
use serde::Serialize;
use std::ops::Range;

use super::RANK_TOLERANCE;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermVif {
    pub term: String,
    pub gvif: f64,
    /// Number of design columns of the term
    pub df: usize,
    /// GVIF^(1/(2·df)), comparable across terms of different width
    pub gvif_adjusted: f64,
}

/// Centre every column of `x` and scale it to unit norm
fn standardize(x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = x.nrows() as f64;
    let mut z = x.clone();
    for (j, mut col) in z.column_iter_mut().enumerate() {
        let mean = col.sum() / n;
        col.add_scalar_mut(-mean);
        let norm = col.norm();
        if !(norm > 0.0) {
            return Err(Error::numeric(
                "vif",
                format!("design column {} has zero variance", j + 1),
            ));
        }
        col /= norm;
    }
    Ok(z)
}

/// ln det(Z_Sᵀ Z_S) for the columns `idx` of `z`
fn log_det_gram(z: &DMatrix<f64>, idx: &[usize]) -> Result<f64> {
    if idx.is_empty() {
        return Ok(0.0);
    }
    let sub = DMatrix::from_fn(z.nrows(), idx.len(), |i, j| z[(i, idx[j])]);
    let r = sub.qr().r();
    let diag = r.diagonal();
    let scale = diag.amax();
    let degenerate = |d: &f64| !d.is_finite() || d.abs() <= scale * RANK_TOLERANCE;
    if !(scale > 0.0) || diag.iter().any(degenerate) {
        return Err(Error::numeric(
            "vif",
            "correlation matrix of the covariates is singular",
        ));
    }
    Ok(diag.iter().map(|d| 2.0 * d.abs().ln()).sum())
}

/// GVIF per term over the non-intercept design matrix `x`.
pub fn term_vif(x: &DMatrix<f64>, groups: &[(String, Range<usize>)]) -> Result<Vec<TermVif>> {
    let z = standardize(x)?;
    let all: Vec<usize> = (0..x.ncols()).collect();
    let log_det_all = log_det_gram(&z, &all)?;

    groups
        .iter()
        .map(|(term, range)| {
            let own: Vec<usize> = range.clone().collect();
            let rest: Vec<usize> = all.iter().copied().filter(|j| !range.contains(j)).collect();
            let log_gvif = log_det_gram(&z, &own)? + log_det_gram(&z, &rest)? - log_det_all;
            // Rounding can leave an exactly uninflated term a hair below 1
            let gvif = log_gvif.max(0.0).exp();
            if !gvif.is_finite() {
                return Err(Error::numeric(
                    "vif",
                    format!("variance inflation of '{}' overflows", term),
                ));
            }
            let df = own.len();
            Ok(TermVif {
                term: term.clone(),
                gvif,
                df,
                gvif_adjusted: gvif.powf(1.0 / (2.0 * df as f64)),
            })
        })
        .collect()
}
