//! Shared world clock.
//!
//! One value per server process: the fraction of a day elapsed, in `[0, 1)`.
//! It advances by `tick / cycle` on every fixed tick and wraps at 1.

use std::time::Duration;

/// Design tick interval.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
/// Design length of one full day.
pub const DEFAULT_CYCLE: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct WorldClock {
    value: f64,
    increment: f64,
    tick: Duration,
}

impl WorldClock {
    /// Starts a clock at `t = 0`. `cycle` must be non-zero.
    pub fn new(tick: Duration, cycle: Duration) -> Self {
        Self {
            value: 0.0,
            increment: tick.as_secs_f64() / cycle.as_secs_f64(),
            tick,
        }
    }

    /// Advances one tick and returns the new value.
    pub fn advance(&mut self) -> f64 {
        self.value = (self.value + self.increment) % 1.0;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick
    }
}

impl Default for WorldClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK, DEFAULT_CYCLE)
    }
}

/// Formats a day fraction as a 12-hour clock, e.g. `6:05 AM`.
pub fn clock_string(t: f64) -> String {
    let total_minutes = (t.rem_euclid(1.0) * 24.0 * 60.0).floor() as u32;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    let ampm = if hours >= 12 { "PM" } else { "AM" };
    let display_hour = if hours % 12 == 0 { 12 } else { hours % 12 };
    format!("{display_hour}:{minutes:02} {ampm}")
}

/// Whether the sun is up at day fraction `t`.
pub fn is_daytime(t: f64) -> bool {
    t > 0.23 && t < 0.73
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Distance between two day fractions, going the short way round.
    fn circular_gap(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(1.0);
        d.min(1.0 - d)
    }

    #[test]
    fn default_increment_is_one_six_hundredth() {
        let clock = WorldClock::default();
        assert!((clock.increment() - 1.0 / 600.0).abs() < 1e-12);
        assert_eq!(clock.value(), 0.0);
        assert_eq!(clock.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn each_tick_adds_increment_mod_one() {
        let mut clock = WorldClock::default();
        let mut prev = clock.value();
        for _ in 0..1500 {
            let next = clock.advance();
            assert!((0.0..1.0).contains(&next));
            let expected = (prev + 1.0 / 600.0) % 1.0;
            assert!(circular_gap(next, expected) < 1e-12);
            prev = next;
        }
    }

    #[test]
    fn full_cycle_returns_to_zero() {
        let mut clock = WorldClock::default();
        for _ in 0..600 {
            clock.advance();
        }
        assert!(circular_gap(clock.value(), 0.0) < 1e-9, "got {}", clock.value());
    }

    #[test]
    fn custom_cycle() {
        let mut clock = WorldClock::new(Duration::from_millis(250), Duration::from_secs(1));
        assert_eq!(clock.advance(), 0.25);
        assert_eq!(clock.advance(), 0.5);
        assert_eq!(clock.advance(), 0.75);
        assert_eq!(clock.advance(), 0.0);
    }

    #[test]
    fn clock_strings() {
        assert_eq!(clock_string(0.0), "12:00 AM");
        assert_eq!(clock_string(0.25), "6:00 AM");
        assert_eq!(clock_string(0.5), "12:00 PM");
        assert_eq!(clock_string(0.75), "6:00 PM");
        assert_eq!(clock_string(13.0 / 24.0 + 5.0 / 1440.0 + 1e-9), "1:05 PM");
    }

    #[test]
    fn daytime_window() {
        assert!(!is_daytime(0.0));
        assert!(!is_daytime(0.23));
        assert!(is_daytime(0.5));
        assert!(!is_daytime(0.73));
    }
}
