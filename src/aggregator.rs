//! Sums every active boost into one bounded output value.

use std::time::Duration;

use crate::boost::{Boost, Envelope};
use crate::config::Config;

#[derive(Debug, Default)]
pub struct Aggregator {
    boosts: Vec<Boost>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlapping boosts coexist and add up.
    pub fn add(&mut self, boost: Boost) {
        self.boosts.push(boost);
    }

    /// Evaluate all boosts at `now` and return the output in `0..=max_value`.
    ///
    /// Boosts past their envelope are pruned after they are summed, so a
    /// boost still counts on the tick where it expires.
    pub fn advance(&mut self, now: Duration, config: &Config) -> u32 {
        let envelope = Envelope::from(config);

        let total: f64 = self
            .boosts
            .iter()
            .map(|b| envelope.value_at(b.elapsed(now)))
            .sum();
        let value = scale(total, config.max_value);

        self.boosts.retain(|b| !envelope.is_expired(b.elapsed(now)));
        value
    }

    pub fn clear(&mut self) {
        self.boosts.clear();
    }

    pub fn len(&self) -> usize {
        self.boosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boosts.is_empty()
    }
}

/// `total` is a percentage of `max_value`. Ties round to even.
fn scale(total: f64, max_value: u32) -> u32 {
    let max = f64::from(max_value);
    let scaled = ((total / 100.0) * max).round_ties_even();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, max) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn config() -> Config {
        Config {
            max_value: 100,
            ..Config::default()
        }
    }

    #[test]
    fn test_empty_is_zero() {
        let mut agg = Aggregator::new();
        assert_eq!(agg.advance(secs(1.0), &config()), 0);
    }

    #[test]
    fn test_single_boost_curve() {
        let mut agg = Aggregator::new();
        let config = config();
        agg.add(Boost::new(secs(0.0)));

        assert_eq!(agg.advance(secs(0.5), &config), 35);
        assert_eq!(agg.advance(secs(1.2), &config), 70);
        assert_eq!(agg.advance(secs(2.0), &config), 61);
        assert_eq!(agg.len(), 1);

        agg.advance(secs(3.31), &config);
        assert!(agg.is_empty());
    }

    #[test]
    fn test_overlapping_boosts_sum_and_clamp() {
        let mut agg = Aggregator::new();
        let config = config();
        agg.add(Boost::new(secs(0.0)));
        agg.add(Boost::new(secs(0.0)));

        // 70 + 70 = 140% of max, clamped
        assert_eq!(agg.advance(secs(1.5), &config), 100);
    }

    #[test]
    fn test_prunes_only_expired_boosts() {
        let mut agg = Aggregator::new();
        let config = Config {
            max_value: 100,
            rise_time: 0.0,
            boost_time: 1.0,
            fall_time: 0.0,
            ..Config::default()
        };
        agg.add(Boost::new(secs(0.0)));
        agg.add(Boost::new(secs(1.0)));

        // First boost is past its hold, second is at its peak
        assert_eq!(agg.advance(secs(1.5), &config), 70);
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn test_default_max_value_scaling() {
        let mut agg = Aggregator::new();
        agg.add(Boost::new(secs(0.0)));
        // 70% of 30 = 21
        assert_eq!(agg.advance(secs(1.5), &Config::default()), 21);
    }

    #[test]
    fn test_scale_rounds_half_to_even() {
        assert_eq!(scale(50.0, 1), 0);
        assert_eq!(scale(150.0, 1), 1);
        assert_eq!(scale(250.0, 1), 1);
        assert_eq!(scale(-10.0, 30), 0);
        assert_eq!(scale(f64::NAN, 30), 0);
    }

    #[test]
    fn test_clear() {
        let mut agg = Aggregator::new();
        agg.add(Boost::new(secs(0.0)));
        agg.clear();
        assert!(agg.is_empty());
    }
}
