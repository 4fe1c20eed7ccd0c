use chrono::{Days, NaiveDate};

use crate::error::{Error, Result};

/// Date layouts accepted by [`parse_date`], tried in order
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%Y%m%d"];

/// Parse a calendar date.
///
/// Tries each of [`DATE_FORMATS`], then RFC 3339 (the time part is dropped).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Contiguous daily calendar `[start, end]`, both ends included.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    if start > end {
        return Err(Error::Config(format!(
            "calendar start {} is after end {}",
            start, end
        )));
    }

    let len = (end - start).num_days() as usize + 1;
    let mut dates = Vec::with_capacity(len);
    let mut current = start;
    while current <= end {
        dates.push(current);
        current = match current.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(dates)
}
