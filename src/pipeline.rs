//! End-to-end run: align, transform, fit, filter, refit, validate.
//!
//! Each stage consumes the previous stage's table and returns a new one;
//! nothing is mutated in place. Any failure aborts the run.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::io;
use crate::schema::CovariateSchema;
use crate::series::DatedSeries;
use crate::stats::cv::{cross_validate, CvConfig, CvReport};
use crate::stats::leverage::{self, LeverageReport};
use crate::stats::regression::{best_subsets, fit, FittedModel, ModelSummary, SubsetReport};
use crate::stats::transform::{
    apply_box_cox, inverse_box_cox, select_lambda, shift_to_positive, BoxCoxSelection,
    ColumnShift, LambdaGrid,
};
use crate::table::ObservationTable;
use crate::temporal::Aligner;

/// Name of the derived column holding the final model's fitted values
pub const FITTED_COLUMN: &str = "fitted";

/// Row counts after each stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub calendar: usize,
    pub observed: usize,
    pub complete: usize,
    pub filtered: usize,
}

/// Everything a run produces
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub dependent: String,
    pub calendar_start: NaiveDate,
    pub calendar_end: NaiveDate,
    pub rows: RowCounts,
    pub shifts: Vec<ColumnShift>,
    pub boxcox: BoxCoxSelection,
    pub preliminary: ModelSummary,
    pub leverage: LeverageReport,
    #[serde(rename = "final")]
    pub final_summary: ModelSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsets: Option<SubsetReport>,
    pub cv: CvReport,
    /// Filtered, transformed observations plus the `fitted` column
    pub table: ObservationTable,
    /// Final fitted model, kept for prediction; not serialized
    #[serde(skip)]
    pub model: FittedModel,
}

impl PipelineReport {
    pub fn lambda(&self) -> f64 {
        self.boxcox.lambda
    }

    /// Shift added to the dependent column before the transform, if any
    pub fn dependent_shift(&self) -> f64 {
        self.shifts
            .iter()
            .find(|s| s.column == self.dependent)
            .map_or(0.0, |s| s.shift)
    }

    /// Fitted values mapped back to the dependent series' own scale
    pub fn fitted_original_scale(&self) -> Result<Vec<f64>> {
        let lambda = self.lambda();
        let shift = self.dependent_shift();
        Ok(self
            .table
            .values(FITTED_COLUMN)?
            .into_iter()
            .map(|z| inverse_box_cox(z, lambda) - shift)
            .collect())
    }
}

/// A configured pipeline, independent of where its series come from.
#[derive(Debug, Clone)]
pub struct Pipeline {
    aligner: Aligner,
    schema: CovariateSchema,
    reference: CovariateSchema,
    grid: LambdaGrid,
    cv: CvConfig,
    subset_max_size: Option<usize>,
}

impl Pipeline {
    /// Pipeline with defaults: calendar from the dependent series, Box–Cox
    /// reference model = the schema's covariates entered linearly.
    pub fn new(dependent: impl Into<String>, schema: CovariateSchema) -> Result<Self> {
        let reference = CovariateSchema::linear(&schema.names())?;
        Ok(Pipeline {
            aligner: Aligner::new(dependent),
            schema,
            reference,
            grid: LambdaGrid::default(),
            cv: CvConfig::default(),
            subset_max_size: None,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let mut pipeline = Pipeline::new(config.dependent.clone(), config.schema()?)?
            .with_reference(config.reference_schema()?)
            .with_grid(config.boxcox.grid.clone())
            .with_cv(config.cv);
        if let Some(calendar) = config.calendar {
            pipeline = pipeline.with_calendar(calendar.start, calendar.end);
        }
        if let Some(size) = config.subset_max_size {
            pipeline = pipeline.with_subset_search(size);
        }
        Ok(pipeline)
    }

    pub fn with_calendar(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.aligner = self.aligner.with_calendar(start, end);
        self
    }

    pub fn with_reference(mut self, reference: CovariateSchema) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_grid(mut self, grid: LambdaGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_cv(mut self, cv: CvConfig) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_subset_search(mut self, max_size: usize) -> Self {
        self.subset_max_size = Some(max_size);
        self
    }

    pub fn schema(&self) -> &CovariateSchema {
        &self.schema
    }

    /// Run every stage on in-memory series.
    pub fn run(&self, series: &[DatedSeries]) -> Result<PipelineReport> {
        let dependent = self.aligner.dependent().to_string();
        let (calendar, observed) = self.aligner.align_and_trim(series)?;
        let (calendar_start, calendar_end) = match (calendar.dates().first(), calendar.dates().last()) {
            (Some(&s), Some(&e)) => (s, e),
            _ => return Err(Error::Shape("calendar is empty".to_string())),
        };

        self.schema.resolve(&observed)?;
        self.reference.resolve(&observed)?;
        if observed.has_column(FITTED_COLUMN) {
            return Err(Error::Shape(format!(
                "input series may not be named '{}'",
                FITTED_COLUMN
            )));
        }

        let mut needed: Vec<&str> = self.schema.names();
        for name in self.reference.names() {
            if !needed.contains(&name) {
                needed.push(name);
            }
        }
        let complete = observed.complete_cases(&needed)?;
        if complete.len() < observed.len() {
            log::warn!(
                "dropped {} rows with a missing covariate",
                observed.len() - complete.len()
            );
        }

        let (shifted, shifts) = shift_to_positive(&complete)?;
        let boxcox = select_lambda(&shifted, &self.reference, &self.grid)?;
        let transformed = apply_box_cox(&shifted, boxcox.lambda)?;

        let preliminary = fit(&transformed, &self.schema)?;
        log::info!(
            "preliminary fit on {} rows: R²={:.4}",
            transformed.len(),
            preliminary.r_squared()
        );

        let leverage = leverage::leverage(&preliminary, &transformed)?;
        let filtered = leverage::filter(&transformed, &leverage)?;

        let model = fit(&filtered, &self.schema)?;
        log::info!(
            "final fit on {} rows: R²={:.4}, AIC={:.2}, BIC={:.2}",
            filtered.len(),
            model.r_squared(),
            model.aic(),
            model.bic()
        );

        let subsets = self
            .subset_max_size
            .map(|size| best_subsets(&filtered, &self.schema, size))
            .transpose()?;
        let cv = cross_validate(&filtered, &self.schema, &model, &self.cv)?;

        let rows = RowCounts {
            calendar: calendar.len(),
            observed: observed.len(),
            complete: complete.len(),
            filtered: filtered.len(),
        };
        let table = filtered.with_column(FITTED_COLUMN, model.fitted_values().to_vec())?;

        Ok(PipelineReport {
            dependent,
            calendar_start,
            calendar_end,
            rows,
            shifts,
            boxcox,
            preliminary: preliminary.summary()?,
            leverage,
            final_summary: model.summary()?,
            subsets,
            cv,
            table,
            model,
        })
    }
}

/// Load every configured source and run the pipeline on it.
pub fn run_config(config: &PipelineConfig) -> Result<PipelineReport> {
    let pipeline = Pipeline::from_config(config)?;
    let series = io::load_all(&config.sources)?;
    pipeline.run(&series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Term;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Days::new(n)
    }

    fn inputs() -> Vec<DatedSeries> {
        let a = DatedSeries::from_observations(
            "a",
            (0..60).map(|i| (day(i), 10.0 + (i as f64 * 0.4).sin() * 3.0 + i as f64 * 0.05)),
        );
        let b = DatedSeries::from_observations(
            "b",
            (0..60).map(|i| (day(i), ((i * 13) % 7) as f64 - 3.0)),
        );
        let y = DatedSeries::from_observations(
            "y",
            (0..60).map(|i| {
                let av = 10.0 + (i as f64 * 0.4).sin() * 3.0 + i as f64 * 0.05;
                let bv = ((i * 13) % 7) as f64 - 3.0;
                let noise = ((i * 7919) % 11) as f64 / 110.0;
                (day(i), (0.2 + 0.1 * av + 0.05 * bv + noise).exp())
            }),
        );
        vec![y, a, b]
    }

    #[test]
    fn test_run_in_memory() {
        let schema = CovariateSchema::linear(&["a", "b"]).unwrap();
        let report = Pipeline::new("y", schema).unwrap().run(&inputs()).unwrap();

        assert_eq!(report.rows.calendar, 60);
        assert_eq!(report.rows.observed, 60);
        assert_eq!(report.rows.filtered, 60 - report.leverage.n_excluded());
        // b has non-positive values and is shifted; y and a are not
        assert_eq!(report.shifts.len(), 1);
        assert_eq!(report.shifts[0].column, "b");
        assert_eq!(report.table.len(), report.rows.filtered);
        assert!(report.table.has_column(FITTED_COLUMN));
        assert_eq!(report.cv.fold_results.len(), 10);
    }

    #[test]
    fn test_fitted_original_scale() {
        let schema = CovariateSchema::linear(&["a", "b"]).unwrap();
        let report = Pipeline::new("y", schema).unwrap().run(&inputs()).unwrap();
        let original = report.fitted_original_scale().unwrap();
        let y = report.table.dependent_values().unwrap();
        // The transformed response maps back onto the same positive scale
        for (fitted, z) in original.iter().zip(&y) {
            let level = inverse_box_cox(*z, report.lambda());
            assert!(*fitted > 0.0);
            assert!((fitted / level).ln().abs() < 0.5);
        }
    }

    #[test]
    fn test_missing_covariate_is_shape_error() {
        let schema = CovariateSchema::new(vec![Term::linear("a"), Term::linear("gdp")]).unwrap();
        let err = Pipeline::new("y", schema).unwrap().run(&inputs()).unwrap_err();
        assert!(matches!(err, Error::Shape(_)));
    }

    #[test]
    fn test_subset_search_optional() {
        let schema = CovariateSchema::linear(&["a", "b"]).unwrap();
        let report = Pipeline::new("y", schema.clone())
            .unwrap()
            .run(&inputs())
            .unwrap();
        assert!(report.subsets.is_none());

        let report = Pipeline::new("y", schema)
            .unwrap()
            .with_subset_search(2)
            .run(&inputs())
            .unwrap();
        assert_eq!(report.subsets.map(|s| s.rows.len()), Some(2));
    }
}
