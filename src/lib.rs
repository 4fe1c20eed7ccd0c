//! Daily-calendar regression pipeline for dated macroeconomic series.
//!
//! Independently dated series are aligned onto one daily calendar and
//! trimmed to the days on which the dependent series was observed. The
//! response is Box–Cox transformed with a profile-likelihood λ, fitted by
//! OLS with optional orthogonal polynomial terms, refitted once without its
//! high-leverage rows, and validated by seeded k-fold cross-validation.
//!
//! ```no_run
//! use macroreg::{PipelineConfig, pipeline};
//!
//! let config = PipelineConfig::from_path("macroreg.toml")?;
//! let report = pipeline::run_config(&config)?;
//! println!("lambda = {}, R² = {}", report.lambda(), report.final_summary.diagnostics.r_squared);
//! # Ok::<(), macroreg::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod na;
pub mod pipeline;
pub mod schema;
pub mod series;
pub mod stats;
pub mod table;
pub mod temporal;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use io::SourceSpec;
pub use na::NA;
pub use pipeline::{Pipeline, PipelineReport};
pub use schema::{Basis, CovariateSchema, Term};
pub use series::DatedSeries;
pub use stats::regression::FittedModel;
pub use table::{CalendarTable, Column, ObservationTable};
pub use temporal::Aligner;

// Export version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
