//! Ordinary least squares with orthogonal polynomial terms.
//!
//! [`fit`] turns an [`ObservationTable`] and a [`CovariateSchema`] into a
//! [`FittedModel`]. The model keeps everything needed to rebuild its design
//! matrix on other rows (the polynomial bases fitted on the training rows),
//! so it can predict held-out data and recompute leverage.

mod poly;
pub mod subset;
pub mod vif;

pub use self::poly::OrthoPoly;
pub use self::subset::{best_subsets, SubsetReport, SubsetRow};
pub use self::vif::TermVif;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::f64::consts::PI;
use std::ops::Range;

use crate::error::{Error, Result};
use crate::schema::{Basis, CovariateSchema, Term};
use crate::table::ObservationTable;

/// Relative tolerance on the diagonal of R below which the design is rank deficient
const RANK_TOLERANCE: f64 = 1e-10;

/// A schema term together with the basis fitted on the training rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedTerm {
    term: Term,
    #[serde(skip_serializing_if = "Option::is_none")]
    basis: Option<OrthoPoly>,
}

impl FittedTerm {
    fn fit(term: &Term, table: &ObservationTable) -> Result<Self> {
        let basis = match term.basis() {
            Basis::Linear => None,
            Basis::Orthogonal(degree) => Some(OrthoPoly::fit(&term.extract(table)?, degree)?),
        };
        Ok(FittedTerm {
            term: term.clone(),
            basis,
        })
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    fn columns(&self, table: &ObservationTable) -> Result<Vec<Vec<f64>>> {
        let x = self.term.extract(table)?;
        Ok(match &self.basis {
            None => vec![x],
            Some(poly) => poly.evaluate(&x),
        })
    }
}

/// Estimate, standard error and t test of one coefficient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

/// Scalar fit diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitDiagnostics {
    /// Rows used in the fit
    pub n: usize,
    /// Coefficients including the intercept
    pub p: usize,
    pub df_residual: usize,
    pub rss: f64,
    /// Residual standard error
    pub sigma: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
}

/// Serializable view of a fitted model for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub dependent: String,
    pub terms: Vec<FittedTerm>,
    pub coefficients: Vec<CoefficientRow>,
    pub diagnostics: FitDiagnostics,
    pub vif: Vec<TermVif>,
}

/// Least-squares solution of `y ≈ X·β`
#[derive(Debug, Clone)]
pub(crate) struct LeastSquares {
    pub coefficients: DVector<f64>,
    pub fitted: DVector<f64>,
    /// R⁻¹ from the QR factorisation; (XᵀX)⁻¹ = R⁻¹·R⁻ᵀ
    pub r_inv: DMatrix<f64>,
    /// Thin Q factor; its squared row norms are the leverages
    pub q: DMatrix<f64>,
}

impl LeastSquares {
    pub fn rss(&self, y: &DVector<f64>) -> f64 {
        (y - &self.fitted).norm_squared()
    }
}

/// Solve OLS by Householder QR.
///
/// Fails with a numeric error when `X` has fewer rows than columns or is
/// rank deficient.
pub(crate) fn least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<LeastSquares> {
    let (n, p) = x.shape();
    if p == 0 || n < p {
        return Err(Error::numeric(
            "regression",
            format!("design matrix is {}x{}; need at least as many rows as columns", n, p),
        ));
    }
    if y.len() != n {
        return Err(Error::Shape(format!(
            "response has {} rows, design matrix has {}",
            y.len(),
            n
        )));
    }

    let qr = x.clone().qr();
    let r = qr.r();
    let q = qr.q();

    let scale = r.diagonal().amax();
    if !(scale > 0.0) || r.diagonal().iter().any(|d| d.abs() <= scale * RANK_TOLERANCE) {
        return Err(Error::numeric("regression", "singular design matrix"));
    }

    let qty = q.transpose() * y;
    let coefficients = r
        .solve_upper_triangular(&qty)
        .ok_or_else(|| Error::numeric("regression", "triangular solve failed"))?;
    let r_inv = r
        .solve_upper_triangular(&DMatrix::identity(p, p))
        .ok_or_else(|| Error::numeric("regression", "could not invert R"))?;
    let fitted = x * &coefficients;

    Ok(LeastSquares {
        coefficients,
        fitted,
        r_inv,
        q,
    })
}

/// A fitted OLS model.
#[derive(Debug, Clone)]
pub struct FittedModel {
    dependent: String,
    terms: Vec<FittedTerm>,
    labels: Vec<String>,
    coefficients: Vec<f64>,
    std_errors: Vec<f64>,
    fitted_values: Vec<f64>,
    residuals: Vec<f64>,
    diagnostics: FitDiagnostics,
    vif: Vec<TermVif>,
}

/// Fit the schema's terms to the table's dependent column.
pub fn fit(table: &ObservationTable, schema: &CovariateSchema) -> Result<FittedModel> {
    schema.resolve(table)?;

    let terms = schema
        .terms()
        .iter()
        .map(|t| FittedTerm::fit(t, table))
        .collect::<Result<Vec<_>>>()?;

    let y_values = table.dependent_values()?;
    let y = DVector::from_vec(y_values.clone());
    let x = design_matrix(&terms, table)?;
    let (n, p) = x.shape();
    if n <= p {
        return Err(Error::numeric(
            "regression",
            format!("{} rows cannot support {} coefficients", n, p),
        ));
    }

    let solution = least_squares(&x, &y)?;
    let rss = solution.rss(&y);
    let df_residual = n - p;

    let mean = y_values.iter().sum::<f64>() / n as f64;
    let tss: f64 = y_values.iter().map(|v| (v - mean).powi(2)).sum();
    if !(tss > 0.0) {
        return Err(Error::numeric(
            "regression",
            format!("dependent column '{}' is constant", table.dependent_name()),
        ));
    }

    let r_squared = 1.0 - rss / tss;
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_residual as f64;
    let sigma2 = rss / df_residual as f64;
    let nf = n as f64;
    let log_likelihood = -0.5 * nf * ((2.0 * PI).ln() + (rss / nf).ln() + 1.0);
    // σ² counts as an estimated parameter
    let k = (p + 1) as f64;
    let aic = -2.0 * log_likelihood + 2.0 * k;
    let bic = -2.0 * log_likelihood + nf.ln() * k;

    let xtx_inv = &solution.r_inv * solution.r_inv.transpose();
    let std_errors: Vec<f64> = (0..p).map(|j| (sigma2 * xtx_inv[(j, j)]).sqrt()).collect();

    let mut labels = vec!["(Intercept)".to_string()];
    labels.extend(schema.terms().iter().flat_map(|t| t.column_labels()));

    let groups = term_groups(&terms);
    let vif = vif::term_vif(&x.columns(1, p - 1).into_owned(), &groups)?;

    let fitted_values: Vec<f64> = solution.fitted.iter().copied().collect();
    let residuals = y_values
        .iter()
        .zip(&fitted_values)
        .map(|(y, f)| y - f)
        .collect();

    let model = FittedModel {
        dependent: table.dependent_name().to_string(),
        terms,
        labels,
        coefficients: solution.coefficients.iter().copied().collect(),
        std_errors,
        fitted_values,
        residuals,
        diagnostics: FitDiagnostics {
            n,
            p,
            df_residual,
            rss,
            sigma: sigma2.sqrt(),
            r_squared,
            adj_r_squared,
            log_likelihood,
            aic,
            bic,
        },
        vif,
    };
    log::debug!(
        "fitted {} coefficients on {} rows: R²={:.4}, AIC={:.2}",
        p,
        n,
        r_squared,
        aic
    );
    Ok(model)
}

/// Non-intercept design column ranges per term
fn term_groups(terms: &[FittedTerm]) -> Vec<(String, Range<usize>)> {
    let mut start = 0;
    terms
        .iter()
        .map(|t| {
            let width = t.term.width();
            let group = (t.term.name().to_string(), start..start + width);
            start += width;
            group
        })
        .collect()
}

/// Design matrix of a schema with bases fitted on `table` itself
pub(crate) fn schema_design(
    schema: &CovariateSchema,
    table: &ObservationTable,
) -> Result<DMatrix<f64>> {
    schema.resolve(table)?;
    let terms = schema
        .terms()
        .iter()
        .map(|t| FittedTerm::fit(t, table))
        .collect::<Result<Vec<_>>>()?;
    design_matrix(&terms, table)
}

/// Design matrix with a leading intercept column
fn design_matrix(terms: &[FittedTerm], table: &ObservationTable) -> Result<DMatrix<f64>> {
    let n = table.len();
    let mut columns: Vec<Vec<f64>> = vec![vec![1.0; n]];
    for term in terms {
        columns.extend(term.columns(table)?);
    }
    Ok(DMatrix::from_fn(n, columns.len(), |i, j| columns[j][i]))
}

impl FittedModel {
    pub fn dependent(&self) -> &str {
        &self.dependent
    }

    pub fn terms(&self) -> &[FittedTerm] {
        &self.terms
    }

    /// Coefficient labels, intercept first
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Coefficients, intercept first
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.coefficients[0]
    }

    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted_values
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.diagnostics
    }

    pub fn r_squared(&self) -> f64 {
        self.diagnostics.r_squared
    }

    pub fn aic(&self) -> f64 {
        self.diagnostics.aic
    }

    pub fn bic(&self) -> f64 {
        self.diagnostics.bic
    }

    pub fn vif(&self) -> &[TermVif] {
        &self.vif
    }

    /// Number of coefficients including the intercept
    pub fn n_coefficients(&self) -> usize {
        self.coefficients.len()
    }

    /// Design matrix of this model's terms evaluated on `table`
    pub fn design_matrix(&self, table: &ObservationTable) -> Result<DMatrix<f64>> {
        design_matrix(&self.terms, table)
    }

    /// Predicted response for every row of `table`
    pub fn predict(&self, table: &ObservationTable) -> Result<Vec<f64>> {
        let x = self.design_matrix(table)?;
        let beta = DVector::from_column_slice(&self.coefficients);
        Ok((x * beta).iter().copied().collect())
    }

    /// Coefficient table with two-sided t-test p-values
    pub fn coefficient_table(&self) -> Result<Vec<CoefficientRow>> {
        let dist = StudentsT::new(0.0, 1.0, self.diagnostics.df_residual as f64)
            .map_err(|e| Error::numeric("regression", e.to_string()))?;
        Ok(self
            .labels
            .iter()
            .zip(self.coefficients.iter().zip(&self.std_errors))
            .map(|(name, (&estimate, &std_error))| {
                let t_value = estimate / std_error;
                CoefficientRow {
                    name: name.clone(),
                    estimate,
                    std_error,
                    t_value,
                    p_value: 2.0 * (1.0 - dist.cdf(t_value.abs())),
                }
            })
            .collect())
    }

    pub fn summary(&self) -> Result<ModelSummary> {
        Ok(ModelSummary {
            dependent: self.dependent.clone(),
            terms: self.terms.clone(),
            coefficients: self.coefficient_table()?,
            diagnostics: self.diagnostics.clone(),
            vif: self.vif.clone(),
        })
    }
}
