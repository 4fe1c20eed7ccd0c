pub mod csv;
pub mod source;

// Re-export commonly used items
pub use self::csv::{read_series, read_series_from, MISSING_MARKERS};
pub use self::source::{SourceSpec, DATE_KEY};

use crate::error::Result;
use crate::series::DatedSeries;

/// Load every source, failing on the first one that cannot be read
pub fn load_all(specs: &[SourceSpec]) -> Result<Vec<DatedSeries>> {
    specs.iter().map(read_series).collect()
}
