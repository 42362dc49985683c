//! Rise / hold / fall shaping of a single repetition.
//!
//! A boost only remembers when it started. Its value is recomputed from
//! the elapsed time and the current [`Config`] every time it is asked, so a
//! config edit reshapes boosts that are already in flight.

use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boost {
    pub start: Duration,
}

impl Boost {
    pub fn new(start: Duration) -> Self {
        Self { start }
    }

    /// Seconds since the boost started. Saturates at zero if `now` is
    /// earlier than the start.
    pub fn elapsed(&self, now: Duration) -> f64 {
        now.saturating_sub(self.start).as_secs_f64()
    }
}

/// Envelope shape in effect for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub peak: f64,
    pub rise: f64,
    pub hold: f64,
    pub fall: f64,
}

impl Envelope {
    /// Negative or NaN durations are treated as zero.
    pub fn new(peak: f64, rise: f64, hold: f64, fall: f64) -> Self {
        Self {
            peak,
            rise: rise.max(0.0),
            hold: hold.max(0.0),
            fall: fall.max(0.0),
        }
    }

    pub fn duration(&self) -> f64 {
        self.rise + self.hold + self.fall
    }

    /// Value `t` seconds after the repetition.
    ///
    /// A zero rise jumps straight to the peak for any `t > 0`; a zero fall
    /// drops to 0 as soon as the hold ends.
    pub fn value_at(&self, t: f64) -> f64 {
        if t <= self.rise {
            if self.rise == 0.0 {
                return 0.0;
            }
            return self.peak * (t / self.rise);
        }
        if t <= self.rise + self.hold {
            return self.peak;
        }
        if self.fall == 0.0 {
            return 0.0;
        }
        let decay = t - self.rise - self.hold;
        self.peak * (1.0 - decay / self.fall).max(0.0)
    }

    pub fn is_expired(&self, t: f64) -> bool {
        t > self.duration()
    }
}

impl From<&Config> for Envelope {
    fn from(config: &Config) -> Self {
        Envelope::new(
            config.boost_value,
            config.rise_time,
            config.boost_time,
            config.fall_time,
        )
    }
}
