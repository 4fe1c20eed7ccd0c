//! Named, dated input series.

use chrono::NaiveDate;

use crate::na::NA;

/// One external source after loading: a name plus `(date, value)` records.
///
/// Records need not be sorted or unique; the aligner sorts them and lets the
/// last record for a date win.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedSeries {
    name: String,
    points: Vec<(NaiveDate, NA<f64>)>,
}

impl DatedSeries {
    pub fn new(name: impl Into<String>, points: Vec<(NaiveDate, NA<f64>)>) -> Self {
        DatedSeries {
            name: name.into(),
            points,
        }
    }

    /// Build from fully observed `(date, value)` pairs
    pub fn from_observations<I>(name: impl Into<String>, observations: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let points = observations
            .into_iter()
            .map(|(date, v)| (date, NA::from(v)))
            .collect();
        Self::new(name, points)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[(NaiveDate, NA<f64>)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Observed points sorted by date, NA records dropped, last record per date kept.
    pub fn observed_sorted(&self) -> Vec<(NaiveDate, f64)> {
        let mut indexed: Vec<(usize, NaiveDate, f64)> = self
            .points
            .iter()
            .enumerate()
            .filter_map(|(i, (date, v))| v.get().map(|v| (i, *date, v)))
            .collect();
        // Stable on (date, input position) so the later record ends up last
        indexed.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

        let mut out: Vec<(NaiveDate, f64)> = Vec::with_capacity(indexed.len());
        for (_, date, v) in indexed {
            match out.last_mut() {
                Some(last) if last.0 == date => {
                    log::warn!(
                        "series '{}' has several records on {}; keeping the last",
                        self.name,
                        date
                    );
                    last.1 = v;
                }
                _ => out.push((date, v)),
            }
        }
        out
    }
}
