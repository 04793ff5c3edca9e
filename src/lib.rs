//! Frame Clock
//!
//! A tick-driven callback scheduler for frame loops:
//! - Every-tick, one-shot and repeating callbacks, all resolved at `tick()`
//! - Missed periods are dropped, never replayed in a burst
//! - Soft intervals spread their deadlines out of phase with the queue
//! - Pluggable time sources: monotonic (with rate scaling) or manual
//! - An optional run loop that sleeps until the next deadline (spin_sleep)

pub mod pq;
pub mod entry;
pub mod soft;
pub mod time_source;
pub mod error;
pub mod config;
pub mod clock;
pub mod global;
pub mod runner;


pub use clock::Clock;
pub use config::ClockConfig;
pub use entry::{Args, Callback};
pub use error::{ConfigError, ConfigResult};
pub use runner::{Runner, RunnerConfig};
pub use time_source::{ManualTime, MonotonicTime, TimeSource};
