//! Statistical stages of the pipeline
//!
//! Response transformation, OLS fitting with diagnostics, leverage filtering
//! and cross-validation. Every stage takes an ObservationTable by reference
//! and returns new values.

pub mod cv;
pub mod leverage;
pub mod regression;
pub mod transform;

pub use cv::{cross_validate, CvConfig, CvReport, FoldResult};
pub use leverage::LeverageReport;
pub use regression::{fit, FittedModel, ModelSummary};
pub use transform::{BoxCoxSelection, ColumnShift, LambdaGrid};
