//! Covariate schema: the ordered, typed list of model terms.
//!
//! Terms are built once from configuration and checked against the table
//! before any fitting, so a missing column fails early as a shape error.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::table::ObservationTable;

/// How a covariate enters the design matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "degree", rename_all = "snake_case")]
pub enum Basis {
    /// The raw column
    Linear,
    /// Orthogonal polynomial basis of the given degree (≥ 1)
    Orthogonal(u32),
}

/// Truncate a configured polynomial degree to a positive integer.
///
/// Fractional values ≥ 1 are truncated toward zero with a warning; values
/// below 1, NaN and infinities are configuration errors.
pub fn truncate_degree(raw: f64) -> Result<u32> {
    if !raw.is_finite() || raw < 1.0 {
        return Err(Error::Config(format!(
            "polynomial degree must be a positive integer, got {}",
            raw
        )));
    }
    if raw > u32::MAX as f64 {
        return Err(Error::Config(format!("polynomial degree {} is too large", raw)));
    }
    let degree = raw.trunc();
    if degree != raw {
        log::warn!("fractional polynomial degree {} truncated to {}", raw, degree);
    }
    Ok(degree as u32)
}

/// One covariate with its basis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Term {
    name: String,
    basis: Basis,
}

impl Term {
    pub fn linear(name: impl Into<String>) -> Self {
        Term {
            name: name.into(),
            basis: Basis::Linear,
        }
    }

    pub fn poly(name: impl Into<String>, degree: u32) -> Result<Self> {
        let name = name.into();
        if degree == 0 {
            return Err(Error::Config(format!(
                "polynomial degree for '{}' must be at least 1",
                name
            )));
        }
        Ok(Term {
            name,
            basis: Basis::Orthogonal(degree),
        })
    }

    /// Term from a configured degree: `None` means linear
    pub fn from_config(name: impl Into<String>, degree: Option<f64>) -> Result<Self> {
        match degree {
            None => Ok(Term::linear(name)),
            Some(raw) => Term::poly(name, truncate_degree(raw)?),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    /// Number of design-matrix columns this term expands to
    pub fn width(&self) -> usize {
        match self.basis {
            Basis::Linear => 1,
            Basis::Orthogonal(d) => d as usize,
        }
    }

    /// Design-matrix column labels
    pub fn column_labels(&self) -> Vec<String> {
        match self.basis {
            Basis::Linear => vec![self.name.clone()],
            Basis::Orthogonal(d) => (1..=d)
                .map(|k| format!("poly({}, {}){}", self.name, d, k))
                .collect(),
        }
    }

    /// Raw covariate values from the table
    pub fn extract(&self, table: &ObservationTable) -> Result<Vec<f64>> {
        table.values(&self.name)
    }
}

/// Ordered list of terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CovariateSchema {
    terms: Vec<Term>,
}

impl CovariateSchema {
    pub fn new(terms: Vec<Term>) -> Result<Self> {
        if terms.is_empty() {
            return Err(Error::Config("covariate schema has no terms".to_string()));
        }
        for (i, term) in terms.iter().enumerate() {
            if terms[..i].iter().any(|t| t.name == term.name) {
                return Err(Error::Config(format!(
                    "covariate '{}' listed more than once",
                    term.name
                )));
            }
        }
        Ok(CovariateSchema { terms })
    }

    /// Every named covariate as a raw linear term
    pub fn linear<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        Self::new(names.iter().map(|n| Term::linear(n.as_ref())).collect())
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn names(&self) -> Vec<&str> {
        self.terms.iter().map(|t| t.name()).collect()
    }

    /// Number of non-intercept design columns
    pub fn width(&self) -> usize {
        self.terms.iter().map(Term::width).sum()
    }

    /// Check every term against the table's columns.
    pub fn resolve(&self, table: &ObservationTable) -> Result<()> {
        for term in &self.terms {
            if !table.has_column(term.name()) {
                return Err(Error::Shape(format!(
                    "covariate '{}' is not a column of the observation table (columns: {})",
                    term.name(),
                    table.column_names().join(", ")
                )));
            }
            if term.name() == table.dependent_name() {
                return Err(Error::Shape(format!(
                    "covariate '{}' is the dependent series",
                    term.name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_degree_policy() {
        assert_eq!(truncate_degree(2.0).unwrap(), 2);
        assert_eq!(truncate_degree(2.7).unwrap(), 2);
        assert_eq!(truncate_degree(1.0).unwrap(), 1);
        assert!(truncate_degree(0.5).is_err());
        assert!(truncate_degree(-3.0).is_err());
        assert!(truncate_degree(f64::NAN).is_err());
    }

    #[test]
    fn test_term_from_config() {
        assert_eq!(Term::from_config("gdp", None).unwrap().basis(), Basis::Linear);
        assert_eq!(
            Term::from_config("gdp", Some(3.9)).unwrap().basis(),
            Basis::Orthogonal(3)
        );
    }

    #[test]
    fn test_column_labels() {
        let term = Term::poly("unrate", 2).unwrap();
        assert_eq!(
            term.column_labels(),
            vec!["poly(unrate, 2)1".to_string(), "poly(unrate, 2)2".to_string()]
        );
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        assert!(CovariateSchema::new(vec![Term::linear("a"), Term::linear("a")]).is_err());
        assert!(CovariateSchema::new(vec![]).is_err());
    }

    #[test]
    fn test_schema_width() {
        let schema =
            CovariateSchema::new(vec![Term::linear("a"), Term::poly("b", 3).unwrap()]).unwrap();
        assert_eq!(schema.width(), 4);
    }
}
