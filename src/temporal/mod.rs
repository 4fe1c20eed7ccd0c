//! Calendar handling: date parsing, daily ranges and series alignment.

mod align;
mod date_range;

pub use self::align::Aligner;
pub use self::date_range::{date_range, parse_date, DATE_FORMATS};
