//! Response transformation: positivity shift and Box–Cox.
//!
//! λ is chosen once by maximising the profile log-likelihood of a reference
//! linear model over a finite grid,
//!
//! ℓ(λ) = −n/2 · ln(RSS_λ / n) + (λ − 1) · Σ ln yᵢ
//!
//! where RSS_λ is the residual sum of squares of the Box–Cox transformed
//! response regressed on the reference covariates.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::regression::{least_squares, schema_design};
use crate::error::{Error, Result};
use crate::schema::CovariateSchema;
use crate::table::ObservationTable;

/// Box–Cox transform of one value
pub fn box_cox(value: f64, lambda: f64) -> f64 {
    if lambda == 0.0 {
        value.ln()
    } else {
        (value.powf(lambda) - 1.0) / lambda
    }
}

/// Inverse Box–Cox transform of one value
pub fn inverse_box_cox(value: f64, lambda: f64) -> f64 {
    if lambda == 0.0 {
        value.exp()
    } else {
        (value * lambda + 1.0).powf(1.0 / lambda)
    }
}

/// Constant added to a column to make it positive
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnShift {
    pub column: String,
    pub shift: f64,
}

/// Shift every column whose minimum is ≤ 0 by `1 − min`, so its values are ≥ 1.
pub fn shift_to_positive(table: &ObservationTable) -> Result<(ObservationTable, Vec<ColumnShift>)> {
    let mut shifted = table.clone();
    let mut shifts = Vec::new();

    for column in table.columns() {
        let min = column.observed().fold(f64::INFINITY, f64::min);
        if min.is_finite() && min <= 0.0 {
            let shift = 1.0 - min;
            shifted = shifted.map_column(column.name(), |v| v + shift)?;
            log::info!("shifted column '{}' by {} to make it positive", column.name(), shift);
            shifts.push(ColumnShift {
                column: column.name().to_string(),
                shift,
            });
        }
    }
    Ok((shifted, shifts))
}

/// Largest number of λ values a grid may expand to
pub const MAX_GRID_POINTS: usize = 10_000;

/// Candidate λ values: every multiple of `step` in `[start, end]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LambdaGrid {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl Default for LambdaGrid {
    fn default() -> Self {
        LambdaGrid {
            start: -2.0,
            end: 2.0,
            step: 0.1,
        }
    }
}

impl LambdaGrid {
    /// Grid values, generated from integer multiples so that 0 is hit exactly
    pub fn values(&self) -> Result<Vec<f64>> {
        if !(self.step > 0.0) || !self.start.is_finite() || !self.end.is_finite() {
            return Err(Error::Config(format!(
                "invalid Box-Cox grid: start={}, end={}, step={}",
                self.start, self.end, self.step
            )));
        }
        if self.start > self.end {
            return Err(Error::Config(format!(
                "Box-Cox grid start {} is after end {}",
                self.start, self.end
            )));
        }

        let first = (self.start / self.step - 1e-9).ceil();
        let last = (self.end / self.step + 1e-9).floor();
        let count = last - first + 1.0;
        if !count.is_finite() || count > MAX_GRID_POINTS as f64 {
            return Err(Error::Config(format!(
                "Box-Cox grid from {} to {} by {} exceeds {} points",
                self.start, self.end, self.step, MAX_GRID_POINTS
            )));
        }
        let (first, last) = (first as i64, last as i64);
        // Divide by 1/step when it is whole: k / 10 is the closest double to k·0.1
        let inverse = 1.0 / self.step;
        let whole_inverse = (inverse - inverse.round()).abs() < 1e-9;
        let values: Vec<f64> = (first..=last)
            .map(|k| {
                if whole_inverse {
                    k as f64 / inverse.round()
                } else {
                    k as f64 * self.step
                }
            })
            .collect();

        if values.is_empty() {
            return Err(Error::Config("Box-Cox grid has no points".to_string()));
        }
        Ok(values)
    }
}

/// One point of the profile likelihood
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfilePoint {
    pub lambda: f64,
    pub log_likelihood: f64,
}

/// Chosen λ and the profile it was chosen from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxCoxSelection {
    pub lambda: f64,
    pub profile: Vec<ProfilePoint>,
}

/// Highest profile point; on equal likelihoods the earliest wins
fn best_point(profile: &[ProfilePoint]) -> Option<ProfilePoint> {
    profile.iter().fold(None, |best: Option<ProfilePoint>, &point| match best {
        Some(b) if !(point.log_likelihood > b.log_likelihood) => Some(b),
        _ => Some(point),
    })
}

fn positive_response(table: &ObservationTable) -> Result<Vec<f64>> {
    let y = table.dependent_values()?;
    if let Some(bad) = y.iter().find(|v| !(**v > 0.0)) {
        return Err(Error::numeric(
            "boxcox",
            format!(
                "column '{}' must be strictly positive, found {}",
                table.dependent_name(),
                bad
            ),
        ));
    }
    Ok(y)
}

/// Pick λ on `grid` maximising the profile log-likelihood of
/// `dependent ~ reference`. Ties go to the smaller λ.
pub fn select_lambda(
    table: &ObservationTable,
    reference: &CovariateSchema,
    grid: &LambdaGrid,
) -> Result<BoxCoxSelection> {
    let y = positive_response(table)?;
    let x = schema_design(reference, table)?;
    let n = y.len() as f64;
    let sum_log_y: f64 = y.iter().map(|v| v.ln()).sum();

    let mut profile = Vec::new();
    for lambda in grid.values()? {
        let z = DVector::from_iterator(y.len(), y.iter().map(|&v| box_cox(v, lambda)));
        let rss = least_squares(&x, &z)?.rss(&z);
        let log_likelihood = -0.5 * n * (rss / n).ln() + (lambda - 1.0) * sum_log_y;
        if !log_likelihood.is_finite() {
            return Err(Error::numeric(
                "boxcox",
                format!(
                    "profile log-likelihood of '{}' is undefined at lambda {}",
                    table.dependent_name(),
                    lambda
                ),
            ));
        }
        log::debug!("boxcox lambda={:.2} loglik={:.4}", lambda, log_likelihood);

        profile.push(ProfilePoint {
            lambda,
            log_likelihood,
        });
    }

    // Grid values ascend, so a tie resolves to the smaller λ
    let best = best_point(&profile)
        .ok_or_else(|| Error::Config("Box-Cox grid has no points".to_string()))?;
    log::info!(
        "selected Box-Cox lambda {} (log-likelihood {:.4})",
        best.lambda,
        best.log_likelihood
    );
    Ok(BoxCoxSelection {
        lambda: best.lambda,
        profile,
    })
}

/// Replace the dependent column with its Box–Cox transform.
pub fn apply_box_cox(table: &ObservationTable, lambda: f64) -> Result<ObservationTable> {
    let y = positive_response(table)?;
    let transformed = y.iter().map(|&v| box_cox(v, lambda)).collect();
    table.with_column(table.dependent_name(), transformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::na::NA;
    use crate::table::Column;
    use chrono::NaiveDate;

    fn table(y: Vec<f64>, x: Vec<f64>) -> ObservationTable {
        let start = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let dates = (0..y.len() as u64).map(|i| start + chrono::Days::new(i)).collect();
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
    fn test_round_trip() {
        for &lambda in &[-1.5, -0.3, 0.0, 0.5, 1.0, 2.0] {
            for &v in &[0.2, 1.0, 3.7, 150.0] {
                let back = inverse_box_cox(box_cox(v, lambda), lambda);
                assert!((back - v).abs() < 1e-9 * v.max(1.0), "lambda={} v={}", lambda, v);
            }
        }
    }

    #[test]
    fn test_default_grid() {
        let values = LambdaGrid::default().values().unwrap();
        assert_eq!(values.len(), 41);
        assert_eq!(values[0], -2.0);
        assert_eq!(values[20], 0.0);
        assert_eq!(values[40], 2.0);
        assert_eq!(values[23], 0.3);
    }

    #[test]
    fn test_invalid_grid() {
        let grid = LambdaGrid {
            start: 1.0,
            end: -1.0,
            step: 0.1,
        };
        assert!(grid.values().is_err());
        let grid = LambdaGrid {
            start: -1.0,
            end: 1.0,
            step: 0.0,
        };
        assert!(grid.values().is_err());
    }

    #[test]
    fn test_oversized_grid_is_config_error() {
        let grid = LambdaGrid {
            start: -2.0,
            end: 2.0,
            step: 1e-12,
        };
        let err = grid.values().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("exceeds"));

        // The cap itself is reachable
        let grid = LambdaGrid {
            start: 1.0,
            end: MAX_GRID_POINTS as f64,
            step: 1.0,
        };
        assert_eq!(grid.values().unwrap().len(), MAX_GRID_POINTS);
    }

    #[test]
    fn test_best_point_prefers_smallest_lambda_on_tie() {
        let point = |lambda, log_likelihood| ProfilePoint {
            lambda,
            log_likelihood,
        };
        let profile = [point(-0.1, 1.0), point(0.0, 2.0), point(0.1, 2.0), point(0.2, 1.5)];
        assert_eq!(best_point(&profile), Some(point(0.0, 2.0)));

        let flat = [point(-1.0, 3.0), point(0.0, 3.0), point(1.0, 3.0)];
        assert_eq!(best_point(&flat).map(|p| p.lambda), Some(-1.0));
        assert_eq!(best_point(&[]), None);
    }

    #[test]
    fn test_shift_to_positive() {
        let t = table(vec![1.0, 2.0, 3.0], vec![-2.0, 0.0, 5.0]);
        let (shifted, shifts) = shift_to_positive(&t).unwrap();
        assert_eq!(shifts, vec![ColumnShift { column: "x".to_string(), shift: 3.0 }]);
        assert_eq!(shifted.values("x").unwrap(), vec![1.0, 3.0, 8.0]);
        assert_eq!(shifted.values("y").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_select_lambda_recovers_log() {
        // y = exp(linear) is linear on the log scale
        let x: Vec<f64> = (0..40).map(|i| i as f64 / 4.0).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| (0.5 + 0.3 * v + 0.05 * ((i * 37 % 11) as f64 - 5.0) / 5.0).exp())
            .collect();
        let t = table(y, x);
        let schema = CovariateSchema::linear(&["x"]).unwrap();
        let selection = select_lambda(&t, &schema, &LambdaGrid::default()).unwrap();
        assert_eq!(selection.profile.len(), 41);
        assert!(selection.lambda.abs() <= 0.2, "lambda = {}", selection.lambda);
    }

    #[test]
    fn test_non_positive_response_is_numeric_error() {
        let t = table(vec![1.0, 0.0, 2.0], vec![1.0, 2.0, 3.0]);
        let schema = CovariateSchema::linear(&["x"]).unwrap();
        let err = select_lambda(&t, &schema, &LambdaGrid::default()).unwrap_err();
        assert!(matches!(err, Error::Numeric { stage: "boxcox", .. }));
        assert!(err.to_string().contains("'y'"));
    }

    #[test]
    fn test_apply_box_cox_returns_new_table() {
        let t = table(vec![1.0, std::f64::consts::E, 4.0], vec![1.0, 2.0, 3.0]);
        let transformed = apply_box_cox(&t, 0.0).unwrap();
        let y = transformed.values("y").unwrap();
        assert!((y[1] - 1.0).abs() < 1e-12);
        assert_eq!(t.values("y").unwrap()[2], 4.0);
    }
}
