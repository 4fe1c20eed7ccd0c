//! Common test utilities module
//!
//! Provides shared utilities for integration tests:
//! - Temporary source directories with CSV series and a config file
//! - Synthetic dated series for end-to-end runs

pub mod test_utils;

#[allow(unused_imports)]
pub use test_utils::{day, synthetic_series, SourceDir, CALENDAR_DAYS, DEPENDENT_DAYS};
