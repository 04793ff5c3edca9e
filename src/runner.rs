//! Runner - a host run loop around a clock
//!
//! Ticks the clock, then sleeps until the next entry is due instead of
//! busy-polling. Sleeping uses spin_sleep for sub-millisecond accuracy.
//! Hosts with their own event loop can ignore this and call
//! [`Clock::tick`] / [`Clock::sleep_time`] directly.

use crate::clock::Clock;
use crate::error::{ConfigError, ConfigResult};
use spin_sleep::SpinSleeper;
use std::time::Duration;
use tracing::debug;

/// Configuration for a [`Runner`].
#[derive(Clone, Debug, PartialEq)]
pub struct RunnerConfig {
    /// Upper bound on ticks per second. `None` ticks as soon as work is due.
    pub fps_limit: Option<f64>,
    /// Nap taken when nothing at all is scheduled.
    pub idle_sleep: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fps_limit: None,
            idle_sleep: Duration::from_millis(1),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> ConfigResult {
        match self.fps_limit {
            Some(fps) if !(fps.is_finite() && fps > 0.0) => Err(ConfigError::InvalidFpsLimit(fps)),
            _ => Ok(()),
        }
    }
}

/// Drives a [`Clock`] in real time.
pub struct Runner {
    clock: Clock,
    sleeper: SpinSleeper,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            sleeper: SpinSleeper::default(),
            config: RunnerConfig::default(),
        }
    }

    pub fn with_config(clock: Clock, config: RunnerConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            clock,
            sleeper: SpinSleeper::default(),
            config,
        })
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Tick until `is_done` returns true. Returns the number of ticks.
    ///
    /// `is_done` is checked after every tick.
    pub fn run_until<F>(&mut self, is_done: F) -> u64
    where
        F: Fn() -> bool,
    {
        let mut frames = 0u64;
        loop {
            let frame_start = self.clock.now();
            self.clock.tick();
            frames += 1;

            if is_done() {
                break;
            }
            self.wait(frame_start);
        }
        debug!(frames, "run loop finished");
        frames
    }

    /// Tick exactly `n` times with the usual pacing.
    pub fn run_frames(&mut self, n: u64) {
        for i in 0..n {
            let frame_start = self.clock.now();
            self.clock.tick();
            if i + 1 < n {
                self.wait(frame_start);
            }
        }
    }

    /// Sleep until the next entry is due, honoring the frame limit.
    fn wait(&self, frame_start: f64) {
        let min_frame = self
            .config
            .fps_limit
            .map_or(0.0, |fps| 1.0 / fps - (self.clock.now() - frame_start));

        let secs = match self.clock.sleep_time() {
            Some(s) => s.max(min_frame),
            None if min_frame > 0.0 => min_frame,
            None => {
                self.sleeper.sleep(self.config.idle_sleep);
                return;
            }
        };

        if secs > 0.0 {
            // Far-off or "never" deadlines do not fit a Duration; nap and re-check.
            let nap = Duration::try_from_secs_f64(secs).unwrap_or(self.config.idle_sleep);
            self.sleeper.sleep(nap);
        }
    }
}
