//! Aligned tables.
//!
//! [`CalendarTable`] holds one row per calendar day for every input series.
//! [`ObservationTable`] is its restriction to the days on which the dependent
//! series was observed. Both are plain values: every operation that changes
//! content returns a new table.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::na::NA;

/// Named column of optional values, row-aligned with its table's dates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    name: String,
    values: Vec<NA<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<NA<f64>>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[NA<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observed values only
    pub fn observed(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|v| v.get())
    }

    fn take(&self, rows: &[usize]) -> Column {
        Column::new(self.name.clone(), rows.iter().map(|&i| self.values[i]).collect())
    }
}

fn check_parts(dates: &[NaiveDate], columns: &[Column], dependent: &str) -> Result<()> {
    if dates.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::Shape(
            "table dates must be unique and strictly increasing".to_string(),
        ));
    }
    for (i, col) in columns.iter().enumerate() {
        if col.len() != dates.len() {
            return Err(Error::Shape(format!(
                "column '{}' has {} values for {} dates",
                col.name,
                col.len(),
                dates.len()
            )));
        }
        if columns[..i].iter().any(|c| c.name == col.name) {
            return Err(Error::Shape(format!("duplicate column '{}'", col.name)));
        }
    }
    if !columns.iter().any(|c| c.name == dependent) {
        return Err(Error::Shape(format!(
            "dependent series '{}' is not among the table columns",
            dependent
        )));
    }
    Ok(())
}

fn find<'a>(columns: &'a [Column], name: &str) -> Result<&'a Column> {
    columns
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| Error::Shape(format!("column '{}' not found", name)))
}

/// One row per day of a contiguous calendar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarTable {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
    dependent: String,
}

impl CalendarTable {
    pub(crate) fn from_parts(
        dates: Vec<NaiveDate>,
        columns: Vec<Column>,
        dependent: impl Into<String>,
    ) -> Result<Self> {
        let dependent = dependent.into();
        check_parts(&dates, &columns, &dependent)?;
        if dates.windows(2).any(|w| (w[1] - w[0]).num_days() != 1) {
            return Err(Error::Shape("calendar dates must be contiguous".to_string()));
        }
        Ok(CalendarTable {
            dates,
            columns,
            dependent,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn dependent_name(&self) -> &str {
        &self.dependent
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        find(&self.columns, name)
    }

    /// Cell lookup by date; dates outside the calendar read as NA
    pub fn value(&self, date: NaiveDate, name: &str) -> Result<NA<f64>> {
        let col = self.column(name)?;
        Ok(match self.dates.binary_search(&date) {
            Ok(i) => col.values[i],
            Err(_) => NA::NA,
        })
    }

    /// Keep only the rows where the dependent series was observed.
    pub fn trim(&self) -> ObservationTable {
        let dep = find(&self.columns, &self.dependent)
            .map(|c| c.values.as_slice())
            .unwrap_or(&[]);
        let rows: Vec<usize> = dep
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_value())
            .map(|(i, _)| i)
            .collect();

        ObservationTable {
            dates: rows.iter().map(|&i| self.dates[i]).collect(),
            columns: self.columns.iter().map(|c| c.take(&rows)).collect(),
            dependent: self.dependent.clone(),
        }
    }
}

/// Rows on which the dependent series was observed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationTable {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
    dependent: String,
}

impl ObservationTable {
    /// Build a table directly, e.g. for data that is already aligned
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<Column>,
        dependent: impl Into<String>,
    ) -> Result<Self> {
        let dependent = dependent.into();
        check_parts(&dates, &columns, &dependent)?;
        Ok(ObservationTable {
            dates,
            columns,
            dependent,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn dependent_name(&self) -> &str {
        &self.dependent
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        find(&self.columns, name)
    }

    /// Fully observed values of a column.
    ///
    /// A missing cell is a numeric error: model inputs must be complete.
    pub fn values(&self, name: &str) -> Result<Vec<f64>> {
        let col = self.column(name)?;
        col.values
            .iter()
            .zip(&self.dates)
            .map(|(v, date)| {
                v.get().ok_or_else(|| {
                    Error::numeric("design", format!("column '{}' is missing on {}", name, date))
                })
            })
            .collect()
    }

    pub fn dependent_values(&self) -> Result<Vec<f64>> {
        self.values(&self.dependent)
    }

    /// Rows at the given positions, in the given order
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        ObservationTable {
            dates: rows.iter().map(|&i| self.dates[i]).collect(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            dependent: self.dependent.clone(),
        }
    }

    /// Rows where every named column is observed
    pub fn complete_cases(&self, names: &[&str]) -> Result<Self> {
        let cols = names
            .iter()
            .map(|n| self.column(n))
            .collect::<Result<Vec<_>>>()?;
        let rows: Vec<usize> = (0..self.len())
            .filter(|&i| cols.iter().all(|c| c.values[i].is_value()))
            .collect();
        Ok(self.select_rows(&rows))
    }

    /// Copy of the table with `name` set to `values` (added if absent)
    pub fn with_column(&self, name: &str, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.len() {
            return Err(Error::Shape(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.len()
            )));
        }
        let column = Column::new(name, values.into_iter().map(NA::from).collect());
        let mut columns = self.columns.clone();
        match columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => *existing = column,
            None => columns.push(column),
        }
        Ok(ObservationTable {
            dates: self.dates.clone(),
            columns,
            dependent: self.dependent.clone(),
        })
    }

    /// Copy of the table with `f` applied to every observed cell of `name`
    pub fn map_column<F>(&self, name: &str, f: F) -> Result<Self>
    where
        F: Fn(f64) -> f64,
    {
        self.column(name)?;
        let columns = self
            .columns
            .iter()
            .map(|c| {
                if c.name == name {
                    Column::new(c.name.clone(), c.values.iter().map(|v| v.map(&f)).collect())
                } else {
                    c.clone()
                }
            })
            .collect();
        Ok(ObservationTable {
            dates: self.dates.clone(),
            columns,
            dependent: self.dependent.clone(),
        })
    }
}
