//! Composition root: routes samples, drives ticks, answers queries.
//!
//! The engine is driven by two call sources, samples pushed at irregular
//! times and a fixed-cadence [`Engine::tick`]. Both must be serialized by
//! the host. Every timestamp is a `Duration` from a host-chosen epoch and
//! must not go backwards between calls.

use std::sync::mpsc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::aggregator::Aggregator;
use crate::boost::Boost;
use crate::calibration::{CalibrationRange, Calibrator};
use crate::config::{Config, ConfigError, ConfigEvent, ConfigEvents, Parameter};
use crate::detector::{Direction, DirectionDetector};
use crate::sample::RawSample;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    Calibrating,
    #[default]
    Tracking,
}

/// Everything a host needs to persist to resume after a restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub range: CalibrationRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineOutput {
    pub value: u32,
    pub direction: Direction,
    pub calibrating: bool,
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
}

#[derive(Debug, Default)]
pub struct Engine {
    config: Config,
    mode: Mode,
    calibrator: Calibrator,
    detector: DirectionDetector,
    aggregator: Aggregator,
    value: u32,
    repetitions: u64,
    events: ConfigEvents,
}

impl Engine {
    /// Start in tracking mode with a previously saved config and range.
    pub fn new(config: Config, range: CalibrationRange) -> Self {
        Self {
            config,
            calibrator: Calibrator::new(range),
            ..Self::default()
        }
    }

    pub fn from_state(state: EngineState) -> Self {
        Self::new(state.config, state.range)
    }

    pub fn state(&self) -> EngineState {
        EngineState {
            config: self.config,
            range: self.calibrator.range(),
        }
    }

    /// Feed one raw reading. Unparseable readings and no-data markers are
    /// dropped without touching any state.
    pub fn on_sample<'a>(&mut self, raw: impl Into<RawSample<'a>>, now: Duration) {
        let distance = match raw.into().distance() {
            Ok(d) => d,
            Err(err) => {
                trace!(%err, "dropping sample");
                return;
            }
        };

        match self.mode {
            Mode::Calibrating => self.calibrator.observe(distance),
            Mode::Tracking => {
                let before = self.detector.direction();
                let range = self.calibrator.range();
                if let Some(event) = self.detector.detect(distance, &range, self.config.tolerance) {
                    self.repetitions += 1;
                    self.aggregator.add(Boost::new(now));
                    debug!(
                        distance = event.distance,
                        threshold = event.threshold,
                        count = self.repetitions,
                        "repetition detected"
                    );
                } else if self.detector.direction() != before {
                    debug!(distance, direction = self.detector.direction().as_str(), "direction changed");
                }
            }
        }
    }

    /// Advance all boosts to `now`. While calibrating the output is held at 0.
    pub fn tick(&mut self, now: Duration) -> u32 {
        self.value = match self.mode {
            Mode::Calibrating => 0,
            Mode::Tracking => self.aggregator.advance(now, &self.config),
        };
        self.value
    }

    pub fn start_calibration(&mut self) {
        self.mode = Mode::Calibrating;
        self.calibrator.reset();
        self.aggregator.clear();
        self.detector.reset();
        self.value = 0;
        self.repetitions = 0;
        info!("calibration started");
    }

    pub fn stop_calibration(&mut self) {
        self.mode = Mode::Tracking;
        let range = self.calibrator.range();
        info!(
            min_distance = ?range.min_distance,
            max_distance = ?range.max_distance,
            "calibration stopped"
        );
    }

    pub fn is_calibrating(&self) -> bool {
        self.mode == Mode::Calibrating
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn value(&self) -> u32 {
        match self.mode {
            Mode::Calibrating => 0,
            Mode::Tracking => self.value,
        }
    }

    pub fn direction(&self) -> Direction {
        self.detector.direction()
    }

    pub fn calibration_range(&self) -> Option<(f64, f64)> {
        self.calibrator.range().bounds()
    }

    /// Repetitions detected since the last calibration start.
    pub fn repetitions(&self) -> u64 {
        self.repetitions
    }

    pub fn active_boosts(&self) -> usize {
        self.aggregator.len()
    }

    pub fn output(&self) -> EngineOutput {
        let range = self.calibrator.range();
        EngineOutput {
            value: self.value(),
            direction: self.direction(),
            calibrating: self.is_calibrating(),
            min_distance: range.min_distance,
            max_distance: range.max_distance,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_parameter(&mut self, param: Parameter, value: f64) -> Result<(), ConfigError> {
        self.config.set(param, value)?;
        debug!(%param, value, "parameter updated");
        self.events.publish(ConfigEvent::Updated(param));
        Ok(())
    }

    pub fn reset_config(&mut self) {
        self.config.reset();
        info!("configuration reset to defaults");
        self.events.publish(ConfigEvent::Reset);
    }

    /// Receive a [`ConfigEvent`] for every later `set_parameter` and
    /// `reset_config` call.
    pub fn subscribe(&mut self) -> mpsc::Receiver<ConfigEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn calibrated() -> Engine {
        Engine::new(Config::default(), CalibrationRange::new(0.0, 100.0))
    }

    #[test]
    fn test_starts_tracking() {
        let engine = Engine::default();
        assert_eq!(engine.mode(), Mode::Tracking);
        assert_eq!(engine.direction(), Direction::Down);
        assert_eq!(engine.value(), 0);
        assert!(engine.calibration_range().is_none());
    }

    #[test]
    fn test_samples_route_by_mode() {
        let mut engine = Engine::default();
        engine.start_calibration();
        engine.on_sample(20.0, secs(0.0));
        engine.on_sample("80", secs(0.1));
        engine.stop_calibration();
        assert_eq!(engine.calibration_range(), Some((20.0, 80.0)));

        engine.on_sample(90.0, secs(0.2));
        assert_eq!(engine.direction(), Direction::Up);
        assert_eq!(engine.calibration_range(), Some((20.0, 80.0)));
    }

    #[test]
    fn test_repetition_adds_boost() {
        let mut engine = calibrated();
        engine.on_sample(95.0, secs(0.0));
        engine.on_sample(5.0, secs(0.5));
        assert_eq!(engine.repetitions(), 1);
        assert_eq!(engine.active_boosts(), 1);

        // Half way up a 1s rise: 35% of 30 is 10.5, ties round to even
        assert_eq!(engine.tick(secs(1.0)), 10);
    }

    #[test]
    fn test_uncalibrated_tracking_is_inert() {
        let mut engine = Engine::default();
        engine.on_sample(0.0, secs(0.0));
        engine.on_sample(100.0, secs(0.1));
        engine.on_sample(0.0, secs(0.2));
        assert_eq!(engine.active_boosts(), 0);
        assert_eq!(engine.direction(), Direction::Down);
    }

    #[test]
    fn test_value_held_at_zero_while_calibrating() {
        let mut engine = calibrated();
        engine.on_sample(95.0, secs(0.0));
        engine.on_sample(5.0, secs(0.0));
        assert!(engine.tick(secs(1.5)) > 0);

        engine.start_calibration();
        assert_eq!(engine.value(), 0);
        assert_eq!(engine.active_boosts(), 0);
        assert_eq!(engine.repetitions(), 0);
        assert_eq!(engine.tick(secs(1.6)), 0);
        assert!(engine.calibration_range().is_none());
    }

    #[test]
    fn test_stop_calibration_keeps_range() {
        let mut engine = calibrated();
        engine.start_calibration();
        engine.on_sample(10.0, secs(0.0));
        engine.on_sample(60.0, secs(0.1));
        engine.stop_calibration();
        assert!(!engine.is_calibrating());
        assert_eq!(engine.calibration_range(), Some((10.0, 60.0)));
    }

    #[test]
    fn test_config_edits_apply_immediately() {
        let mut engine = calibrated();
        engine.on_sample(95.0, secs(0.0));
        engine.on_sample(5.0, secs(0.0));
        assert_eq!(engine.tick(secs(1.5)), 21);

        engine.set_parameter(Parameter::MaxValue, 100.0).unwrap();
        assert_eq!(engine.tick(secs(1.5)), 70);
    }

    #[test]
    fn test_set_parameter_rejects_and_keeps_value() {
        let mut engine = Engine::default();
        let events = engine.subscribe();
        assert!(engine.set_parameter(Parameter::Tolerance, 80.0).is_err());
        assert_eq!(engine.config().tolerance, 15.0);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_config_events() {
        let mut engine = Engine::default();
        let events = engine.subscribe();

        engine.set_parameter(Parameter::FallTime, 2.0).unwrap();
        engine.reset_config();

        assert_eq!(events.try_recv().unwrap(), ConfigEvent::Updated(Parameter::FallTime));
        assert_eq!(events.try_recv().unwrap(), ConfigEvent::Reset);
        assert_eq!(engine.config().fall_time, 1.5);
    }

    #[test]
    fn test_state_round_trip() {
        let mut engine = calibrated();
        engine.set_parameter(Parameter::Tolerance, 20.0).unwrap();

        let restored = Engine::from_state(engine.state());
        assert_eq!(restored.config().tolerance, 20.0);
        assert_eq!(restored.calibration_range(), Some((0.0, 100.0)));
        assert!(!restored.is_calibrating());
    }

    #[test]
    fn test_output_json() {
        let engine = calibrated();
        let json = serde_json::to_value(engine.output()).unwrap();
        assert_eq!(json["value"], 0);
        assert_eq!(json["direction"], "down");
        assert_eq!(json["calibrating"], false);
        assert_eq!(json["min_distance"], 0.0);
        assert_eq!(json["max_distance"], 100.0);
    }
}
