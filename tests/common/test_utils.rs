//! Test utilities for temporary source files
//!
//! Source CSVs and configs are written into a `tempfile::TempDir`, which is
//! removed when the [`SourceDir`] is dropped.

#![allow(dead_code)]

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use macroreg::DatedSeries;

/// Length of the synthetic calendar
pub const CALENDAR_DAYS: u64 = 100;
/// Days on which the synthetic dependent series is observed
pub const DEPENDENT_DAYS: usize = 60;

/// Day `n` of the synthetic calendar, day 0 being 2020-01-01
pub fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Days::new(n)
}

fn covariate_a(k: u64) -> f64 {
    3.0 + (k as f64 * 0.9).sin() * 2.0 + k as f64 * 0.3
}

fn covariate_b(k: u64) -> f64 {
    ((k * 7) % 10) as f64 - 2.0
}

/// Dependent observed on 60 of 100 days; covariates `a` and `b` every 10 days.
///
/// The dependent is log-linear in the forward-filled covariates plus a small
/// deterministic disturbance.
pub fn synthetic_series() -> Vec<DatedSeries> {
    let a = DatedSeries::from_observations(
        "a",
        (0..CALENDAR_DAYS).step_by(10).map(|d| (day(d), covariate_a(d / 10))),
    );
    let b = DatedSeries::from_observations(
        "b",
        (0..CALENDAR_DAYS).step_by(10).map(|d| (day(d), covariate_b(d / 10))),
    );
    let y = DatedSeries::from_observations(
        "y",
        (0..CALENDAR_DAYS).filter(|d| d % 5 < 3).map(|d| {
            let k = d / 10;
            let noise = ((d * 7919) % 13) as f64 / 130.0 - 0.05;
            let level = 0.5 + 0.2 * covariate_a(k) + 0.05 * covariate_b(k) + noise;
            (day(d), level.exp())
        }),
    );
    vec![y, a, b]
}

/// Temporary directory holding source CSVs and a config file
pub struct SourceDir {
    dir: TempDir,
}

impl SourceDir {
    pub fn new() -> Self {
        SourceDir {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `name` inside the directory
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write test file");
        path
    }

    /// Write a series as a FRED-style CSV with headers `DATE,<name>`
    pub fn write_series(&self, series: &DatedSeries) -> PathBuf {
        let mut csv = format!("DATE,{}\n", series.name());
        for (date, value) in series.points() {
            match value.value() {
                Some(v) => csv.push_str(&format!("{},{}\n", date.format("%Y-%m-%d"), v)),
                None => csv.push_str(&format!("{},.\n", date.format("%Y-%m-%d"))),
            }
        }
        self.write(&format!("{}.csv", series.name()), &csv)
    }
}
