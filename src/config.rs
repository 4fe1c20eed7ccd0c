//! Pipeline configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! dependent = "SP500"
//! subset_max_size = 3
//!
//! [[sources]]
//! name = "SP500"
//! path = "data/SP500.csv"
//!
//! [[sources]]
//! name = "president"
//! path = "data/president.csv"
//! date_column = "took_office"
//! value_column = "party"
//!
//! [[covariates]]
//! name = "GDP"
//! degree = 2
//!
//! [calendar]
//! start = "2015-01-01"
//! end = "2020-12-31"
//!
//! [boxcox]
//! reference = ["GDP"]
//!
//! [cv]
//! folds = 10
//! seed = 1
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::io::SourceSpec;
use crate::schema::{CovariateSchema, Term};
use crate::stats::cv::CvConfig;
use crate::stats::transform::LambdaGrid;

/// Explicit calendar range, both ends included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One covariate; without `degree` it enters linearly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovariateConfig {
    pub name: String,
    #[serde(default)]
    pub degree: Option<f64>,
}

/// Box–Cox settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxCoxConfig {
    /// Covariates of the reference model; defaults to the configured covariates
    pub reference: Option<Vec<String>>,
    pub grid: LambdaGrid,
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub dependent: String,
    pub sources: Vec<SourceSpec>,
    pub covariates: Vec<CovariateConfig>,
    #[serde(default)]
    pub calendar: Option<CalendarConfig>,
    #[serde(default)]
    pub boxcox: BoxCoxConfig,
    #[serde(default)]
    pub cv: CvConfig,
    #[serde(default)]
    pub subset_max_size: Option<usize>,
}

impl PipelineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file. Relative source paths are taken
    /// relative to the file's directory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.sources = config
            .sources
            .into_iter()
            .map(|s| s.resolved(base))
            .collect();
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dependent.trim().is_empty() {
            return Err(Error::Config("dependent series name is empty".to_string()));
        }
        for (i, source) in self.sources.iter().enumerate() {
            if self.sources[..i].iter().any(|s| s.name == source.name) {
                return Err(Error::Config(format!(
                    "source '{}' is configured more than once",
                    source.name
                )));
            }
        }
        let known = |name: &str| self.sources.iter().any(|s| s.name == name);
        if !known(&self.dependent) {
            return Err(Error::Config(format!(
                "dependent series '{}' has no source",
                self.dependent
            )));
        }

        let schema = self.schema()?;
        for name in schema.names().into_iter().chain(self.reference_names()) {
            if name == self.dependent {
                return Err(Error::Config(format!(
                    "'{}' is the dependent series and cannot be a covariate",
                    name
                )));
            }
            if !known(name) {
                return Err(Error::Config(format!("covariate '{}' has no source", name)));
            }
        }
        self.reference_schema()?;

        if let Some(calendar) = &self.calendar {
            if calendar.start > calendar.end {
                return Err(Error::Config(format!(
                    "calendar start {} is after end {}",
                    calendar.start, calendar.end
                )));
            }
        }
        self.boxcox.grid.values()?;
        if self.cv.folds < 2 {
            return Err(Error::Config(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.cv.folds
            )));
        }
        if self.subset_max_size == Some(0) {
            return Err(Error::Config("subset_max_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The model's covariate schema, with degrees truncated
    pub fn schema(&self) -> Result<CovariateSchema> {
        let terms = self
            .covariates
            .iter()
            .map(|c| Term::from_config(c.name.clone(), c.degree))
            .collect::<Result<Vec<_>>>()?;
        CovariateSchema::new(terms)
    }

    fn reference_names(&self) -> Vec<&str> {
        match &self.boxcox.reference {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => self.covariates.iter().map(|c| c.name.as_str()).collect(),
        }
    }

    /// Linear schema of the Box–Cox reference model
    pub fn reference_schema(&self) -> Result<CovariateSchema> {
        CovariateSchema::linear(&self.reference_names())
    }
}
