//! Clock tuning knobs.

use crate::error::{ConfigError, ConfigResult};

/// Configuration for a [`Clock`](crate::Clock).
#[derive(Clone, Debug, PartialEq)]
pub struct ClockConfig {
    /// Number of recent tick deltas kept for `average_interval()`.
    pub history_window: usize,
    /// Seconds since the last tick after which new schedules anchor to the
    /// live time instead of the last tick.
    pub stall_threshold: f64,
    /// Overshoot (seconds) below which an overdue interval entry keeps its
    /// phase instead of being soft-rescheduled.
    pub jitter_tolerance: f64,
    /// Subdivision limit for the soft scheduling search. At least 2, so the
    /// search always probes a point past its basis.
    pub max_subdivisions: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            history_window: 60,
            stall_threshold: 0.2,
            jitter_tolerance: 0.05,
            max_subdivisions: 16,
        }
    }
}

fn check_threshold(name: &'static str, value: f64) -> ConfigResult {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}

impl ClockConfig {
    pub fn validate(&self) -> ConfigResult {
        if self.history_window == 0 {
            return Err(ConfigError::EmptyHistoryWindow);
        }
        check_threshold("stall_threshold", self.stall_threshold)?;
        check_threshold("jitter_tolerance", self.jitter_tolerance)?;
        if self.max_subdivisions < 2 {
            return Err(ConfigError::NoSubdivisions(self.max_subdivisions));
        }
        Ok(())
    }
}
