//! Learns the operating range of the distance signal.

use serde::{Deserialize, Serialize};

/// Observed extremes of the signal. Both bounds are set together on the
/// first observation, so either both are present or neither is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRange {
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
}

/// Hysteresis band derived from a calibrated range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub lower: f64,
    pub upper: f64,
}

impl CalibrationRange {
    pub fn new(min_distance: f64, max_distance: f64) -> Self {
        Self {
            min_distance: Some(min_distance.min(max_distance)),
            max_distance: Some(max_distance.max(min_distance)),
        }
    }

    pub fn bounds(&self) -> Option<(f64, f64)> {
        Some((self.min_distance?, self.max_distance?))
    }

    pub fn is_calibrated(&self) -> bool {
        self.bounds().is_some()
    }

    /// Trim `tolerance` percent of the span off each end.
    ///
    /// At `tolerance >= 50` the band inverts (`lower > upper`). That is left
    /// as is; the detector compares literally.
    pub fn thresholds(&self, tolerance: f64) -> Option<Thresholds> {
        let (min, max) = self.bounds()?;
        let margin = (tolerance / 100.0) * (max - min);
        Some(Thresholds {
            lower: min + margin,
            upper: max - margin,
        })
    }
}

#[derive(Debug, Default)]
pub struct Calibrator {
    range: CalibrationRange,
}

impl Calibrator {
    pub fn new(range: CalibrationRange) -> Self {
        Self { range }
    }

    pub fn observe(&mut self, distance: f64) {
        self.range = match self.range.bounds() {
            None => CalibrationRange {
                min_distance: Some(distance),
                max_distance: Some(distance),
            },
            Some((min, max)) => CalibrationRange {
                min_distance: Some(min.min(distance)),
                max_distance: Some(max.max(distance)),
            },
        };
    }

    pub fn reset(&mut self) {
        self.range = CalibrationRange::default();
    }

    pub fn range(&self) -> CalibrationRange {
        self.range
    }
}
