//! Calendar alignment of independently dated series.

use chrono::NaiveDate;

use super::date_range::date_range;
use crate::error::{Error, Result};
use crate::na::{forward_fill, NA};
use crate::series::DatedSeries;
use crate::table::{CalendarTable, Column, ObservationTable};

/// Merges dated series onto one daily calendar.
///
/// Every series except the dependent one is forward-filled; the dependent
/// series keeps only its own observations.
#[derive(Debug, Clone)]
pub struct Aligner {
    dependent: String,
    calendar: Option<(NaiveDate, NaiveDate)>,
}

impl Aligner {
    pub fn new(dependent: impl Into<String>) -> Self {
        Aligner {
            dependent: dependent.into(),
            calendar: None,
        }
    }

    /// Fix the calendar range instead of deriving it from the dependent series
    pub fn with_calendar(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.calendar = Some((start, end));
        self
    }

    pub fn dependent(&self) -> &str {
        &self.dependent
    }

    /// Calendar bounds: the configured range, or the dependent series'
    /// first and last observed dates.
    pub fn calendar_for(&self, series: &[DatedSeries]) -> Result<(NaiveDate, NaiveDate)> {
        if let Some(range) = self.calendar {
            return Ok(range);
        }
        let dependent = self.dependent_series(series)?;
        let observed = dependent.observed_sorted();
        match (observed.first(), observed.last()) {
            (Some(first), Some(last)) => Ok((first.0, last.0)),
            _ => Err(Error::Shape(format!(
                "dependent series '{}' has no observations",
                self.dependent
            ))),
        }
    }

    fn dependent_series<'a>(&self, series: &'a [DatedSeries]) -> Result<&'a DatedSeries> {
        series
            .iter()
            .find(|s| s.name() == self.dependent)
            .ok_or_else(|| {
                Error::Shape(format!(
                    "dependent series '{}' is not among the inputs",
                    self.dependent
                ))
            })
    }

    /// Merge all series onto the calendar.
    pub fn align(&self, series: &[DatedSeries]) -> Result<CalendarTable> {
        for (i, s) in series.iter().enumerate() {
            if series[..i].iter().any(|other| other.name() == s.name()) {
                return Err(Error::Shape(format!("duplicate series name '{}'", s.name())));
            }
        }
        self.dependent_series(series)?;

        let (start, end) = self.calendar_for(series)?;
        let dates = date_range(start, end)?;

        let columns = series
            .iter()
            .map(|s| {
                let values = if s.name() == self.dependent {
                    observed_on(&dates, s)
                } else {
                    filled_on(&dates, s)
                };
                Column::new(s.name(), values)
            })
            .collect();

        let table = CalendarTable::from_parts(dates, columns, self.dependent.clone())?;
        log::info!(
            "aligned {} series onto {} days ({} .. {})",
            series.len(),
            table.len(),
            start,
            end
        );
        Ok(table)
    }

    /// Align, then drop the days without a dependent observation.
    pub fn align_and_trim(&self, series: &[DatedSeries]) -> Result<(CalendarTable, ObservationTable)> {
        let calendar = self.align(series)?;
        let observations = calendar.trim();
        log::info!(
            "kept {} of {} calendar rows with an observed '{}'",
            observations.len(),
            calendar.len(),
            self.dependent
        );
        Ok((calendar, observations))
    }
}

/// Values exactly on their dates, NA elsewhere
fn observed_on(dates: &[NaiveDate], series: &DatedSeries) -> Vec<NA<f64>> {
    let mut values = vec![NA::NA; dates.len()];
    let Some(&start) = dates.first() else {
        return values;
    };
    for (date, v) in series.observed_sorted() {
        if date < start {
            continue;
        }
        let offset = (date - start).num_days() as usize;
        if offset < values.len() {
            values[offset] = NA::Value(v);
        }
    }
    values
}

/// Values carried forward from the most recent observation at or before each date
fn filled_on(dates: &[NaiveDate], series: &DatedSeries) -> Vec<NA<f64>> {
    let Some(&start) = dates.first() else {
        return Vec::new();
    };
    let observed = series.observed_sorted();
    let seed = observed
        .iter()
        .take_while(|(date, _)| *date < start)
        .last()
        .map(|&(_, v)| NA::Value(v))
        .unwrap_or(NA::NA);

    forward_fill(&observed_on(dates, series), seed)
}
