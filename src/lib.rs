//! Repetition detection for a noisy distance signal.
//!
//! A proximity sensor pointed at someone doing pushups produces a distance
//! that swings between two extremes. The [`Engine`] learns those extremes
//! during calibration, counts a repetition each time the signal returns
//! through the lower threshold of a hysteresis band, and turns every
//! repetition into a rise / hold / fall boost. A periodic tick sums the
//! active boosts into one value bounded by `max_value`.

pub mod aggregator;
pub mod boost;
pub mod calibration;
pub mod config;
pub mod detector;
pub mod engine;
pub mod sample;

pub use aggregator::Aggregator;
pub use boost::{Boost, Envelope};
pub use calibration::{CalibrationRange, Calibrator, Thresholds};
pub use config::{Config, ConfigError, ConfigEvent, Parameter};
pub use detector::{Direction, DirectionDetector, RepetitionEvent};
pub use engine::{Engine, EngineOutput, EngineState, Mode};
pub use sample::{RawSample, SampleError};
