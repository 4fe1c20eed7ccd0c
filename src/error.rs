use thiserror::Error;

/// Error type for the whole pipeline.
///
/// Every variant is fatal: stages propagate it with `?` and the run stops.
#[derive(Error, Debug)]
pub enum Error {
    /// A source could not be read, or its date column is missing or malformed
    #[error("load error in source '{series}': {message}")]
    Load { series: String, message: String },

    /// A referenced column is absent from the table schema
    #[error("shape error: {0}")]
    Shape(String),

    /// A numeric stage could not produce a defined result
    #[error("numeric error in {stage}: {message}")]
    Numeric { stage: &'static str, message: String },

    /// Invalid pipeline configuration
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Load`] tagged with the offending source.
    pub fn load(series: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Load {
            series: series.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::Numeric`] raised by `stage`.
    pub fn numeric(stage: &'static str, message: impl Into<String>) -> Self {
        Error::Numeric {
            stage,
            message: message.into(),
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_names_source() {
        let err = Error::load("president", "date column 'took_office' not found");
        let msg = err.to_string();
        assert!(msg.contains("president"));
        assert!(msg.contains("took_office"));
    }

    #[test]
    fn test_numeric_error_names_stage() {
        let err = Error::numeric("boxcox", "column 'sp500' has non-positive values");
        assert!(err.to_string().starts_with("numeric error in boxcox"));
    }
}
