use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;

use super::source::SourceSpec;
use crate::error::{Error, Result};
use crate::na::NA;
use crate::series::DatedSeries;
use crate::temporal::parse_date;

/// Value cells read as missing
pub const MISSING_MARKERS: &[&str] = &["", ".", "NA", "NaN"];

/// Read one source from its CSV file
pub fn read_series(spec: &SourceSpec) -> Result<DatedSeries> {
    let file = File::open(&spec.path).map_err(|e| {
        Error::load(
            &spec.name,
            format!("cannot open {}: {}", spec.path.display(), e),
        )
    })?;
    let series = read_series_from(spec, file)?;
    log::info!(
        "loaded {} records for '{}' from {}",
        series.len(),
        spec.name,
        spec.path.display()
    );
    Ok(series)
}

/// Read one source from any CSV reader. The date column is renamed to the
/// canonical key on the way in, so only `spec` knows the source's own header.
pub fn read_series_from<R: Read>(spec: &SourceSpec, reader: R) -> Result<DatedSeries> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| Error::load(&spec.name, e.to_string()))?
        .clone();
    let find = |header: &str| {
        headers
            .iter()
            .position(|h| h == header)
            .ok_or_else(|| Error::load(&spec.name, format!("column '{}' not found", header)))
    };
    let date_idx = find(spec.date_header())?;
    let value_idx = find(spec.value_header())?;

    let mut points = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        // Header is line 1
        let line = i + 2;
        let record = record.map_err(|e| Error::load(&spec.name, e.to_string()))?;

        let raw_date = record.get(date_idx).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| {
            Error::load(
                &spec.name,
                format!("line {}: cannot parse date '{}'", line, raw_date),
            )
        })?;

        let raw_value = record.get(value_idx).unwrap_or("");
        let value = if MISSING_MARKERS.contains(&raw_value) {
            NA::NA
        } else {
            let v: f64 = raw_value.parse().map_err(|_| {
                Error::load(
                    &spec.name,
                    format!("line {}: cannot parse value '{}'", line, raw_value),
                )
            })?;
            NA::from(v)
        };
        points.push((date, value));
    }

    Ok(DatedSeries::new(spec.name.clone(), points))
}
