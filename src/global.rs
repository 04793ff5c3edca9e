//! Ambient default clock
//!
//! For hosts that want free functions instead of passing a [`Clock`]
//! around. Each thread lazily gets its own default clock backed by
//! [`MonotonicTime`]; `set_default` swaps it out. The engine itself never
//! looks here.

use crate::clock::Clock;
use crate::entry::{Args, Callback};
use crate::time_source::MonotonicTime;
use std::cell::RefCell;

// Thread-local default clock storage.
thread_local! {
    static DEFAULT_CLOCK: RefCell<Clock> = RefCell::new(Clock::new(MonotonicTime::new()));
}

/// A handle to this thread's default clock.
pub fn get_default() -> Clock {
    DEFAULT_CLOCK.with(|c| c.borrow().clone())
}

/// Replace this thread's default clock. Returns the previous one.
pub fn set_default(clock: Clock) -> Clock {
    DEFAULT_CLOCK.with(|c| c.replace(clock))
}

pub fn schedule(callback: &Callback, args: Args) {
    get_default().schedule(callback, args);
}

pub fn schedule_once(callback: &Callback, delay: f64, args: Args) {
    get_default().schedule_once(callback, delay, args);
}

pub fn schedule_interval(callback: &Callback, interval: f64, args: Args) {
    get_default().schedule_interval(callback, interval, args);
}

pub fn schedule_interval_soft(callback: &Callback, interval: f64, args: Args) {
    get_default().schedule_interval_soft(callback, interval, args);
}

pub fn unschedule(callback: &Callback) {
    get_default().unschedule(callback);
}

pub fn tick() -> f64 {
    get_default().tick()
}

pub fn sleep_time() -> Option<f64> {
    get_default().sleep_time()
}
