use serde::{Serialize, Serializer};
use std::fmt::{self, Debug, Display};

/// A value that may be missing (Not Available).
///
/// Series values, calendar cells and observation cells all carry `NA<f64>`
/// so that "not observed yet" is explicit in the type rather than encoded as NaN.
#[derive(Clone, Copy, PartialEq)]
pub enum NA<T> {
    /// Present value
    Value(T),
    /// Missing value
    NA,
}

impl<T> NA<T> {
    /// Whether the value is missing
    pub fn is_na(&self) -> bool {
        matches!(self, NA::NA)
    }

    /// Whether a value is present
    pub fn is_value(&self) -> bool {
        !self.is_na()
    }

    /// Borrow the value if present
    pub fn value(&self) -> Option<&T> {
        match self {
            NA::Value(v) => Some(v),
            NA::NA => None,
        }
    }

    /// Map the present value, keeping NA as NA
    pub fn map<U, F>(self, f: F) -> NA<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            NA::Value(v) => NA::Value(f(v)),
            NA::NA => NA::NA,
        }
    }
}

impl<T: Copy> NA<T> {
    /// Copy the value out as an `Option`
    pub fn get(&self) -> Option<T> {
        self.value().copied()
    }

    /// Return `self` if present, otherwise `fallback`
    pub fn or(self, fallback: NA<T>) -> NA<T> {
        match self {
            NA::Value(_) => self,
            NA::NA => fallback,
        }
    }
}

impl<T> From<Option<T>> for NA<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => NA::Value(v),
            None => NA::NA,
        }
    }
}

impl From<f64> for NA<f64> {
    /// NaN becomes NA
    fn from(v: f64) -> Self {
        if v.is_nan() {
            NA::NA
        } else {
            NA::Value(v)
        }
    }
}

impl<T: Debug> Debug for NA<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NA::Value(v) => write!(f, "{:?}", v),
            NA::NA => write!(f, "NA"),
        }
    }
}

impl<T: Display> Display for NA<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NA::Value(v) => write!(f, "{}", v),
            NA::NA => write!(f, "NA"),
        }
    }
}

// Serialized as the value or `null`
impl<T: Serialize> Serialize for NA<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            NA::Value(v) => serializer.serialize_some(v),
            NA::NA => serializer.serialize_none(),
        }
    }
}

/// Forward-fill a sequence: each NA takes the most recent earlier value.
///
/// Leading NAs stay NA unless `seed` carries a value observed before the
/// first element.
pub fn forward_fill(values: &[NA<f64>], seed: NA<f64>) -> Vec<NA<f64>> {
    let mut last = seed;
    values
        .iter()
        .map(|&v| {
            if v.is_value() {
                last = v;
            }
            last
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_becomes_na() {
        assert!(NA::from(f64::NAN).is_na());
        assert_eq!(NA::from(1.5), NA::Value(1.5));
    }

    #[test]
    fn test_forward_fill_leading_na() {
        let values = vec![NA::NA, NA::Value(5.0), NA::NA, NA::NA, NA::Value(7.0), NA::NA];
        let filled = forward_fill(&values, NA::NA);
        assert_eq!(
            filled,
            vec![
                NA::NA,
                NA::Value(5.0),
                NA::Value(5.0),
                NA::Value(5.0),
                NA::Value(7.0),
                NA::Value(7.0)
            ]
        );
    }

    #[test]
    fn test_forward_fill_with_seed() {
        let filled = forward_fill(&[NA::NA, NA::NA, NA::Value(2.0)], NA::Value(1.0));
        assert_eq!(filled, vec![NA::Value(1.0), NA::Value(1.0), NA::Value(2.0)]);
    }

    #[test]
    fn test_serialize_na_as_null() {
        let json = serde_json::to_string(&vec![NA::Value(1.0), NA::NA]).unwrap();
        assert_eq!(json, "[1.0,null]");
    }
}
