//! Orthogonal polynomial bases.
//!
//! The basis is built on the training values with the three-term recurrence
//!
//! p₀ = 1, p₁ = x − α₀, pₖ₊₁ = (x − αₖ)·pₖ − (‖pₖ‖² / ‖pₖ₋₁‖²)·pₖ₋₁
//!
//! with αₖ = Σ x·pₖ² / ‖pₖ‖². Keeping α and the squared norms lets the same
//! basis be evaluated on rows that were not part of the fit, which is what
//! prediction on held-out folds needs. Columns are scaled to unit norm on the
//! training values.

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrthoPoly {
    /// Centering constants α₀..α_{d−1}
    alpha: Vec<f64>,
    /// Squared norms ‖p₀‖²..‖p_d‖² on the training values
    norm2: Vec<f64>,
}

impl OrthoPoly {
    /// Build a degree-`degree` basis on `x`.
    pub fn fit(x: &[f64], degree: u32) -> Result<Self> {
        let degree = degree as usize;
        if degree == 0 {
            return Err(Error::Config("polynomial degree must be at least 1".to_string()));
        }

        let mut distinct = x.to_vec();
        distinct.sort_by(|a, b| a.total_cmp(b));
        distinct.dedup();
        if distinct.len() <= degree {
            return Err(Error::numeric(
                "polynomial basis",
                format!(
                    "degree {} needs more than {} distinct points, got {}",
                    degree,
                    degree,
                    distinct.len()
                ),
            ));
        }

        let mut alpha = Vec::with_capacity(degree);
        let mut norm2 = Vec::with_capacity(degree + 1);
        let mut prev: Vec<f64> = vec![0.0; x.len()];
        let mut current: Vec<f64> = vec![1.0; x.len()];

        for k in 0..=degree {
            let nk: f64 = current.iter().map(|p| p * p).sum();
            if !(nk > f64::EPSILON) {
                return Err(Error::numeric(
                    "polynomial basis",
                    format!("basis column {} vanished", k),
                ));
            }
            norm2.push(nk);
            if k == degree {
                break;
            }

            let ak = x
                .iter()
                .zip(&current)
                .map(|(xi, p)| xi * p * p)
                .sum::<f64>()
                / nk;
            alpha.push(ak);

            let ratio = if k == 0 { 0.0 } else { nk / norm2[k - 1] };
            let next: Vec<f64> = x
                .iter()
                .zip(current.iter().zip(&prev))
                .map(|(xi, (p, q))| (xi - ak) * p - ratio * q)
                .collect();
            prev = std::mem::replace(&mut current, next);
        }

        Ok(OrthoPoly { alpha, norm2 })
    }

    pub fn degree(&self) -> usize {
        self.alpha.len()
    }

    /// Basis columns p₁..p_d evaluated at `x`, each as one vector
    pub fn evaluate(&self, x: &[f64]) -> Vec<Vec<f64>> {
        let degree = self.degree();
        let mut columns = Vec::with_capacity(degree);
        let mut prev: Vec<f64> = vec![0.0; x.len()];
        let mut current: Vec<f64> = vec![1.0; x.len()];

        for k in 0..degree {
            let ratio = if k == 0 { 0.0 } else { self.norm2[k] / self.norm2[k - 1] };
            let ak = self.alpha[k];
            let next: Vec<f64> = x
                .iter()
                .zip(current.iter().zip(&prev))
                .map(|(xi, (p, q))| (xi - ak) * p - ratio * q)
                .collect();

            let scale = self.norm2[k + 1].sqrt();
            columns.push(next.iter().map(|v| v / scale).collect());
            prev = std::mem::replace(&mut current, next);
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_basis_is_orthonormal_on_training_values() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.5 + 3.0).collect();
        let basis = OrthoPoly::fit(&x, 3).unwrap();
        let cols = basis.evaluate(&x);
        assert_eq!(cols.len(), 3);
        for i in 0..3 {
            // Orthogonal to the constant
            assert!(cols[i].iter().sum::<f64>().abs() < 1e-9);
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot(&cols[i], &cols[j]) - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_first_column_is_centered_linear() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let cols = OrthoPoly::fit(&x, 1).unwrap().evaluate(&x);
        let norm = (1.5f64.powi(2) * 2.0 + 0.5f64.powi(2) * 2.0).sqrt();
        assert!((cols[0][0] + 1.5 / norm).abs() < 1e-12);
        assert!((cols[0][3] - 1.5 / norm).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_new_points_extends_polynomial() {
        // A degree-2 basis evaluated off-sample stays a quadratic in x
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let basis = OrthoPoly::fit(&x, 2).unwrap();
        let new_x = vec![10.0, 11.0, 12.0, 13.0];
        let col = &basis.evaluate(&new_x)[1];
        let second_diff_a = col[2] - 2.0 * col[1] + col[0];
        let second_diff_b = col[3] - 2.0 * col[2] + col[1];
        assert!((second_diff_a - second_diff_b).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_distinct_points() {
        let x = vec![1.0, 1.0, 2.0, 2.0];
        assert!(matches!(
            OrthoPoly::fit(&x, 2),
            Err(Error::Numeric { .. })
        ));
    }
}
