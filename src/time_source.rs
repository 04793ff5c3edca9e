//! Time sources
//!
//! A [`Clock`](crate::Clock) never reads the system time itself; it asks a
//! [`TimeSource`] for "now" in seconds. Two are provided:
//! - [`MonotonicTime`]: wall time from `Instant`, with time dilation
//! - [`ManualTime`]: host-stepped time for offline runs and tests

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonically non-decreasing time in seconds.
pub trait TimeSource {
    fn now(&self) -> f64;
}

impl<F> TimeSource for F
where
    F: Fn() -> f64,
{
    fn now(&self) -> f64 {
        self()
    }
}

/// Clamp to positive, finite value. Returns 1.0 for invalid inputs.
fn clamp_rate(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        1.0
    }
}

#[derive(Debug)]
struct Anchors {
    rate: Cell<f64>,
    wall_anchor: Cell<Instant>,
    logical_anchor: Cell<f64>,
}

/// Wall-clock time since creation, scaled by a dilation rate.
///
/// Clones share the same anchors, so the host can keep a handle and change
/// the rate while a clock owns another.
#[derive(Clone, Debug)]
pub struct MonotonicTime(Rc<Anchors>);

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self(Rc::new(Anchors {
            rate: Cell::new(1.0),
            wall_anchor: Cell::new(Instant::now()),
            logical_anchor: Cell::new(0.0),
        }))
    }

    /// Set the time dilation rate. Time already elapsed is kept.
    pub fn set_rate(&self, rate: f64) {
        let l = self.now();
        self.0.logical_anchor.set(l);
        self.0.wall_anchor.set(Instant::now());
        self.0.rate.set(clamp_rate(rate));
    }

    pub fn rate(&self) -> f64 {
        self.0.rate.get()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> f64 {
        let dt = self.0.wall_anchor.get().elapsed().as_secs_f64();
        self.0.logical_anchor.get() + dt * self.0.rate.get()
    }
}

/// Time that only moves when the host says so.
#[derive(Clone, Debug, Default)]
pub struct ManualTime(Rc<Cell<f64>>);

impl ManualTime {
    pub fn new(start: f64) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    pub fn set(&self, t: f64) {
        self.0.set(t);
    }

    /// Step forward by `dt` seconds. Non-finite or negative steps are ignored.
    pub fn advance(&self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.0.set(self.0.get() + dt);
        }
    }

    pub fn get(&self) -> f64 {
        self.0.get()
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> f64 {
        self.0.get()
    }
}
