//! Raw readings as delivered by an upstream distance sensor.

use thiserror::Error;

/// States an upstream sensor reports instead of a number when it has no data.
const NO_DATA: [&str; 3] = ["unknown", "unavailable", "none"];

#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    #[error("sensor reported no data")]
    NoData,
    #[error("unparseable reading: {0:?}")]
    Unparseable(String),
    #[error("non-finite reading: {0}")]
    NonFinite(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawSample<'a> {
    Value(f64),
    Text(&'a str),
    Missing,
}

impl RawSample<'_> {
    /// Parse into a finite distance.
    pub fn distance(&self) -> Result<f64, SampleError> {
        let value = match *self {
            RawSample::Missing => return Err(SampleError::NoData),
            RawSample::Value(v) => v,
            RawSample::Text(s) => {
                let s = s.trim();
                if s.is_empty() || NO_DATA.iter().any(|n| s.eq_ignore_ascii_case(n)) {
                    return Err(SampleError::NoData);
                }
                s.parse::<f64>()
                    .map_err(|_| SampleError::Unparseable(s.to_string()))?
            }
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(SampleError::NonFinite(value))
        }
    }
}

impl From<f64> for RawSample<'_> {
    fn from(v: f64) -> Self {
        RawSample::Value(v)
    }
}

impl<'a> From<&'a str> for RawSample<'a> {
    fn from(s: &'a str) -> Self {
        RawSample::Text(s)
    }
}

impl<'a> From<Option<&'a str>> for RawSample<'a> {
    fn from(s: Option<&'a str>) -> Self {
        s.map_or(RawSample::Missing, RawSample::Text)
    }
}
