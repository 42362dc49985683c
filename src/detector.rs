//! Two-threshold direction detector.
//! Counts a repetition when the signal comes back down through the lower
//! threshold after having crossed the upper one.

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationRange;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepetitionEvent {
    pub distance: f64,
    /// Lower threshold the sample crossed.
    pub threshold: f64,
}

#[derive(Debug, Default)]
pub struct DirectionDetector {
    direction: Direction,
}

impl DirectionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one distance sample. Returns a RepetitionEvent on the UP -> DOWN
    /// transition. Without a calibrated range nothing happens.
    pub fn detect(
        &mut self,
        distance: f64,
        range: &CalibrationRange,
        tolerance: f64,
    ) -> Option<RepetitionEvent> {
        let t = range.thresholds(tolerance)?;

        match self.direction {
            Direction::Up if distance <= t.lower => {
                self.direction = Direction::Down;
                Some(RepetitionEvent {
                    distance,
                    threshold: t.lower,
                })
            }
            Direction::Down if distance >= t.upper => {
                self.direction = Direction::Up;
                None
            }
            _ => None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn reset(&mut self) {
        self.direction = Direction::Down;
    }
}
