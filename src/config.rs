//! Tunable parameters for detection and boost shaping.
//!
//! The engine reads a `Config` fresh on every sample and tick, so edits take
//! effect immediately. Range checks live here, at the boundary, and only
//! apply to values that go through [`Config::set`].

use std::fmt;
use std::str::FromStr;
use std::sync::mpsc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TOLERANCE: f64 = 15.0;
pub const DEFAULT_MAX_VALUE: u32 = 30;
pub const DEFAULT_RISE_TIME: f64 = 1.0;
pub const DEFAULT_BOOST_TIME: f64 = 0.8;
pub const DEFAULT_FALL_TIME: f64 = 1.5;
pub const DEFAULT_BOOST_VALUE: f64 = 70.0;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{param} must be within {min}..={max}, got {value}")]
    OutOfRange {
        param: Parameter,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{param} must be finite, got {value}")]
    NotFinite { param: Parameter, value: f64 },

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Tolerance,
    MaxValue,
    RiseTime,
    BoostTime,
    FallTime,
    BoostValue,
}

impl Parameter {
    pub const ALL: [Parameter; 6] = [
        Parameter::Tolerance,
        Parameter::MaxValue,
        Parameter::RiseTime,
        Parameter::BoostTime,
        Parameter::FallTime,
        Parameter::BoostValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Tolerance => "tolerance",
            Parameter::MaxValue => "max_value",
            Parameter::RiseTime => "rise_time",
            Parameter::BoostTime => "boost_time",
            Parameter::FallTime => "fall_time",
            Parameter::BoostValue => "boost_value",
        }
    }

    /// Accepted `(min, max)` at the configuration boundary.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Parameter::Tolerance => (0.0, 30.0),
            Parameter::MaxValue => (1.0, 100.0),
            Parameter::RiseTime | Parameter::BoostTime | Parameter::FallTime => (0.0, 5.0),
            Parameter::BoostValue => (0.0, 100.0),
        }
    }

    pub fn validate(&self, value: f64) -> Result<f64, ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::NotFinite { param: *self, value });
        }
        let (min, max) = self.range();
        if value < min || value > max {
            return Err(ConfigError::OutOfRange {
                param: *self,
                value,
                min,
                max,
            });
        }
        Ok(value)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parameter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownParameter(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Percent of the calibrated span trimmed from each end to form the
    /// hysteresis band.
    pub tolerance: f64,
    /// Upper bound of the engine output.
    pub max_value: u32,
    /// Seconds for a boost to ramp from 0 to `boost_value`.
    pub rise_time: f64,
    /// Seconds a boost holds at `boost_value`.
    pub boost_time: f64,
    /// Seconds for a boost to decay back to 0.
    pub fall_time: f64,
    /// Peak contribution of one repetition, in percent of `max_value`.
    pub boost_value: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_value: DEFAULT_MAX_VALUE,
            rise_time: DEFAULT_RISE_TIME,
            boost_time: DEFAULT_BOOST_TIME,
            fall_time: DEFAULT_FALL_TIME,
            boost_value: DEFAULT_BOOST_VALUE,
        }
    }
}

impl Config {
    pub fn reset(&mut self) {
        *self = Config::default();
    }

    pub fn get(&self, param: Parameter) -> f64 {
        match param {
            Parameter::Tolerance => self.tolerance,
            Parameter::MaxValue => f64::from(self.max_value),
            Parameter::RiseTime => self.rise_time,
            Parameter::BoostTime => self.boost_time,
            Parameter::FallTime => self.fall_time,
            Parameter::BoostValue => self.boost_value,
        }
    }

    /// Validated write. `max_value` is rounded to the nearest integer.
    pub fn set(&mut self, param: Parameter, value: f64) -> Result<(), ConfigError> {
        let value = param.validate(value)?;
        match param {
            Parameter::Tolerance => self.tolerance = value,
            Parameter::MaxValue => self.max_value = value.round() as u32,
            Parameter::RiseTime => self.rise_time = value,
            Parameter::BoostTime => self.boost_time = value,
            Parameter::FallTime => self.fall_time = value,
            Parameter::BoostValue => self.boost_value = value,
        }
        Ok(())
    }
}

/// Published whenever the configuration changes through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEvent {
    Updated(Parameter),
    Reset,
}

/// Fan-out of [`ConfigEvent`]s to any number of subscribers.
#[derive(Debug, Default)]
pub struct ConfigEvents {
    subscribers: Vec<mpsc::Sender<ConfigEvent>>,
}

impl ConfigEvents {
    pub fn subscribe(&mut self) -> mpsc::Receiver<ConfigEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber, forgetting the ones whose
    /// receiver has been dropped.
    pub fn publish(&mut self, event: ConfigEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
