use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Canonical name of the date column
pub const DATE_KEY: &str = "DATE";

/// Where one named series comes from.
///
/// `date_column` renames a source whose date field is not called
/// [`DATE_KEY`]; `value_column` defaults to the series name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub date_column: Option<String>,
    #[serde(default)]
    pub value_column: Option<String>,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        SourceSpec {
            name: name.into(),
            path: path.into(),
            date_column: None,
            value_column: None,
        }
    }

    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = Some(column.into());
        self
    }

    pub fn with_value_column(mut self, column: impl Into<String>) -> Self {
        self.value_column = Some(column.into());
        self
    }

    /// Header holding the dates
    pub fn date_header(&self) -> &str {
        self.date_column.as_deref().unwrap_or(DATE_KEY)
    }

    /// Header holding the values
    pub fn value_header(&self) -> &str {
        self.value_column.as_deref().unwrap_or(&self.name)
    }

    /// Resolve a relative path against `base`
    pub(crate) fn resolved(mut self, base: &Path) -> Self {
        if self.path.is_relative() {
            self.path = base.join(&self.path);
        }
        self
    }
}
