//! Clock - the tick-driven scheduler
//!
//! Holds two collections:
//! - every-tick entries, fired on each `tick()` in registration order
//! - timed entries in a min-queue keyed by their next deadline
//!
//! `tick()` reads the time source, fires a snapshot of the every-tick
//! entries, then pops timed entries due at or before the tick time one at
//! a time, re-arming interval entries as it goes. No borrow of the clock
//! is held while a callback runs, so callbacks may schedule or unschedule
//! anything, themselves included. Timed entries a callback adds with a
//! deadline at or before the tick time fire in the same tick.
//!
//! Interval entries fire at most once per tick. Missed periods are never
//! replayed; an entry that fell far behind is soft-rescheduled instead.

use crate::config::ClockConfig;
use crate::entry::{Args, Callback, ScheduledEntry};
use crate::error::ConfigResult;
use crate::pq::MinPq;
use crate::soft::soft_next_ts;
use crate::time_source::TimeSource;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

struct ClockInner {
    source: Box<dyn TimeSource>,
    config: ClockConfig,

    /// Time at construction; the scheduling basis until the first tick.
    created_ts: f64,
    /// Time recorded by the last tick (or `set_time`).
    last_ts: Option<f64>,
    /// Recent tick deltas, oldest first.
    times: VecDeque<f64>,

    every_tick: Vec<Rc<ScheduledEntry>>,
    pending: MinPq<Rc<ScheduledEntry>>,
    /// Timed entries popped and currently being invoked.
    firing: Vec<Rc<ScheduledEntry>>,

    /// Deterministic sequence counter (queue ids and tie-breaks).
    seq: u64,
}

impl ClockInner {
    fn alloc_seq(&mut self) -> u64 {
        let s = self.seq;
        self.seq += 1;
        s
    }

    /// The timestamp new schedules are computed from.
    ///
    /// Normally the last tick time, so callbacks scheduled in quick
    /// succession line up. After a stall the live time is used instead.
    fn basis_ts(&self) -> f64 {
        let last = self.last_ts.unwrap_or(self.created_ts);
        let now = self.source.now();
        if now - last > self.config.stall_threshold {
            now
        } else {
            last
        }
    }

    fn insert(&mut self, entry: Rc<ScheduledEntry>) {
        let id = self.alloc_seq();
        let deadline = entry.next_ts.get();
        self.pending.add(id, deadline, id, entry);
    }

    fn soft_ts(&self, basis: f64, interval: f64) -> f64 {
        let sorted = self.pending.sorted_deadlines();
        soft_next_ts(basis, interval, &sorted, self.config.max_subdivisions)
    }
}

/// A handle to a scheduler. Clones share the same schedule.
#[derive(Clone)]
pub struct Clock(Rc<RefCell<ClockInner>>);

impl Clock {
    /// Create a clock with the default configuration.
    pub fn new(source: impl TimeSource + 'static) -> Self {
        Self::build(Box::new(source), ClockConfig::default())
    }

    /// Create a clock with a custom configuration.
    pub fn with_config(source: impl TimeSource + 'static, config: ClockConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(Box::new(source), config))
    }

    fn build(source: Box<dyn TimeSource>, config: ClockConfig) -> Self {
        let created_ts = source.now();
        Self(Rc::new(RefCell::new(ClockInner {
            source,
            times: VecDeque::with_capacity(config.history_window),
            config,
            created_ts,
            last_ts: None,
            every_tick: Vec::new(),
            pending: MinPq::new(),
            firing: Vec::new(),
            seq: 0,
        })))
    }

    /// Current time according to the time source.
    pub fn now(&self) -> f64 {
        self.0.borrow().source.now()
    }

    /// Time recorded by the last tick, if any.
    pub fn last_ts(&self) -> Option<f64> {
        self.0.borrow().last_ts
    }

    pub fn config(&self) -> ClockConfig {
        self.0.borrow().config.clone()
    }

    // --- Registration ---

    /// Call `callback` on every tick with the tick's `dt`.
    pub fn schedule(&self, callback: &Callback, args: Args) {
        let entry = ScheduledEntry::every_tick(callback.clone(), args);
        self.0.borrow_mut().every_tick.push(entry);
        debug!(?callback, "scheduled every tick");
    }

    /// Call `callback` once, `delay` seconds from now.
    pub fn schedule_once(&self, callback: &Callback, delay: f64, args: Args) {
        let mut inner = self.0.borrow_mut();
        let last_ts = inner.basis_ts();
        let next_ts = last_ts + delay;
        let entry = ScheduledEntry::timed(callback.clone(), args, 0.0, last_ts, next_ts);
        inner.insert(entry);
        debug!(?callback, next_ts, "scheduled once");
    }

    /// Call `callback` every `interval` seconds.
    ///
    /// An interval of 0 fires once, like `schedule_once(callback, 0.0)`.
    pub fn schedule_interval(&self, callback: &Callback, interval: f64, args: Args) {
        let mut inner = self.0.borrow_mut();
        let last_ts = inner.basis_ts();
        let next_ts = last_ts + interval;
        let entry = ScheduledEntry::timed(callback.clone(), args, interval, last_ts, next_ts);
        inner.insert(entry);
        debug!(?callback, interval, next_ts, "scheduled interval");
    }

    /// Like [`schedule_interval`](Self::schedule_interval), but the first
    /// deadline is moved out of phase with entries already queued.
    ///
    /// The first `dt` reported to the callback equals `interval`.
    pub fn schedule_interval_soft(&self, callback: &Callback, interval: f64, args: Args) {
        let mut inner = self.0.borrow_mut();
        let basis = inner.basis_ts();
        let next_ts = inner.soft_ts(basis, interval);
        let last_ts = next_ts - interval;
        let entry = ScheduledEntry::timed(callback.clone(), args, interval, last_ts, next_ts);
        inner.insert(entry);
        debug!(?callback, interval, next_ts, "scheduled soft interval");
    }

    /// Remove every entry registered with `callback`.
    ///
    /// Matching entries are neutralized before removal, so a tick already
    /// iterating a snapshot skips them. Unknown callbacks are ignored.
    pub fn unschedule(&self, callback: &Callback) {
        let mut inner = self.0.borrow_mut();
        let mut removed = 0usize;

        inner.every_tick.retain(|e| {
            if e.matches(callback) {
                e.cancel();
                removed += 1;
                false
            } else {
                true
            }
        });

        removed += inner.pending.retain(|e| {
            if e.matches(callback) {
                e.cancel();
                false
            } else {
                true
            }
        });

        // Popped entries mid-invocation must not be re-armed.
        for e in inner.firing.iter().filter(|e| e.matches(callback)) {
            e.cancel();
            removed += 1;
        }

        if removed > 0 {
            debug!(?callback, removed, "unscheduled");
        }
    }

    // --- Ticking ---

    /// Advance the clock and fire everything that is due.
    ///
    /// Returns the seconds since the previous tick, or 0 on the first.
    pub fn tick(&self) -> f64 {
        let dt = self.update_time();
        self.call_scheduled_functions(dt);
        dt
    }

    /// Read the time source and record it as the tick time, without firing.
    ///
    /// Returns the delta since the previous recorded time, or 0 if none.
    pub fn update_time(&self) -> f64 {
        let mut inner = self.0.borrow_mut();
        let ts = inner.source.now();
        let dt = match inner.last_ts {
            Some(last) => {
                let dt = ts - last;
                inner.times.push_back(dt);
                if inner.times.len() > inner.config.history_window {
                    inner.times.pop_front();
                }
                dt
            }
            None => 0.0,
        };
        inner.last_ts = Some(ts);
        dt
    }

    /// Fire the every-tick entries with `dt`, then every timed entry due
    /// at the last recorded time.
    ///
    /// `dt` is only forwarded; it does not decide what is due. Returns true
    /// if any callback ran.
    pub fn call_scheduled_functions(&self, dt: f64) -> bool {
        let (ts, snapshot) = {
            let inner = self.0.borrow();
            (inner.last_ts.unwrap_or(inner.created_ts), inner.every_tick.clone())
        };

        let mut called = false;
        for entry in &snapshot {
            if entry.is_cancelled() {
                continue;
            }
            called = true;
            entry.callback.call(self, dt, &entry.args);
        }

        // Re-peek after every pop: callbacks may queue entries already due.
        let mut fired = 0usize;
        while let Some(entry) = self.pop_due(ts) {
            called = true;
            fired += 1;
            entry.callback.call(self, ts - entry.last_ts.get(), &entry.args);
            self.rearm(entry, ts);
        }

        trace!(ts, every_tick = snapshot.len(), timed = fired, "tick");
        called
    }

    fn pop_due(&self, ts: f64) -> Option<Rc<ScheduledEntry>> {
        let mut inner = self.0.borrow_mut();
        match inner.pending.peek_deadline() {
            Some(next) if next <= ts => {}
            _ => return None,
        }
        let (_, _, entry) = inner.pending.pop()?;
        inner.firing.push(Rc::clone(&entry));
        Some(entry)
    }

    /// Put a fired entry back in the queue if it repeats and survived its
    /// own invocation.
    fn rearm(&self, entry: Rc<ScheduledEntry>, ts: f64) {
        let mut inner = self.0.borrow_mut();
        inner.firing.pop();
        if entry.is_cancelled() || !entry.is_repeating() {
            return;
        }

        let interval = entry.interval;
        let mut next_ts = entry.last_ts.get() + interval;
        let mut last_ts = ts;
        if next_ts <= ts {
            let overshoot = ts - next_ts;
            if overshoot < inner.config.jitter_tolerance {
                next_ts = ts + interval;
            } else {
                // Far behind: spread out instead of piling up on one tick,
                // and fake last_ts so the next dt looks like one interval.
                next_ts = inner.soft_ts(ts, interval);
                last_ts = next_ts - interval;
                debug!(callback = ?entry.callback, overshoot, next_ts, "resynced interval");
            }
        }

        entry.last_ts.set(last_ts);
        entry.next_ts.set(next_ts);
        inner.insert(entry);
    }

    /// Set the recorded tick time directly without firing anything.
    ///
    /// Returns the delta from the previous recorded time, or 0 if none.
    pub fn set_time(&self, ts: f64) -> f64 {
        let mut inner = self.0.borrow_mut();
        let dt = inner.last_ts.map_or(0.0, |last| ts - last);
        inner.last_ts = Some(ts);
        dt
    }

    // --- Queries ---

    /// Seconds until something is due.
    ///
    /// `Some(0.0)` when an every-tick entry exists, `None` when nothing is
    /// scheduled at all.
    pub fn sleep_time(&self) -> Option<f64> {
        let mut inner = self.0.borrow_mut();
        if !inner.every_tick.is_empty() {
            return Some(0.0);
        }
        let next = inner.pending.peek_deadline()?;
        Some((next - inner.source.now()).max(0.0))
    }

    /// Mean of the recent tick deltas, or 0 before two ticks.
    pub fn average_interval(&self) -> f64 {
        let inner = self.0.borrow();
        if inner.times.is_empty() {
            return 0.0;
        }
        inner.times.iter().sum::<f64>() / inner.times.len() as f64
    }

    /// Ticks per second over the recent history, or 0 if unknown.
    pub fn fps(&self) -> f64 {
        let interval = self.average_interval();
        if interval > 0.0 {
            1.0 / interval
        } else {
            0.0
        }
    }

    pub fn every_tick_len(&self) -> usize {
        self.0.borrow().every_tick.len()
    }

    pub fn pending_len(&self) -> usize {
        self.0.borrow().pending.len()
    }

    /// Deadlines of all timed entries, ascending.
    pub fn pending_deadlines(&self) -> Vec<f64> {
        self.0.borrow().pending.sorted_deadlines()
    }

    /// True if `callback` has any live entry.
    ///
    /// A repeating entry that is mid-invocation counts, since it will be
    /// re-armed unless unscheduled first. A one-shot mid-invocation does not.
    pub fn is_scheduled(&self, callback: &Callback) -> bool {
        let inner = self.0.borrow();
        inner.every_tick.iter().any(|e| e.matches(callback))
            || inner.pending.values().any(|e| e.matches(callback))
            || inner
                .firing
                .iter()
                .any(|e| e.is_repeating() && !e.is_cancelled() && e.matches(callback))
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(inner) => f
                .debug_struct("Clock")
                .field("last_ts", &inner.last_ts)
                .field("every_tick", &inner.every_tick.len())
                .field("pending", &inner.pending.len())
                .finish(),
            Err(_) => f.write_str("Clock { <busy> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_source::ManualTime;
    use std::cell::Cell;

    fn counter() -> (Callback, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (Callback::from_dt(move |_| c.set(c.get() + 1)), count)
    }

    #[test]
    fn test_first_tick_returns_zero() {
        let time = ManualTime::new(5.0);
        let clock = Clock::new(time.clone());
        assert_eq!(clock.tick(), 0.0);
        time.set(6.0);
        assert_eq!(clock.tick(), 1.0);
        time.set(8.0);
        assert_eq!(clock.tick(), 2.0);
    }

    #[test]
    fn test_set_time_returns_delta() {
        let clock = Clock::new(ManualTime::new(0.0));
        assert_eq!(clock.set_time(1.0), 0.0);
        assert_eq!(clock.set_time(3.5), 2.5);
        assert_eq!(clock.last_ts(), Some(3.5));
    }

    #[test]
    fn test_call_scheduled_functions_reports_activity() {
        let clock = Clock::new(ManualTime::new(0.0));
        assert!(!clock.call_scheduled_functions(0.0));

        let (cb, count) = counter();
        clock.schedule_once(&cb, 1.0, Args::none());
        assert!(!clock.call_scheduled_functions(0.0));
        clock.set_time(1.0);
        assert!(clock.call_scheduled_functions(0.0));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_every_tick_entry_called_without_tick() {
        let clock = Clock::new(ManualTime::new(0.0));
        let (cb, count) = counter();
        clock.schedule(&cb, Args::none());
        assert!(clock.call_scheduled_functions(0.0));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_scheduling_does_not_call() {
        let clock = Clock::new(ManualTime::new(0.0));
        let (cb, count) = counter();
        clock.schedule(&cb, Args::none());
        clock.schedule_once(&cb, 0.0, Args::none());
        clock.schedule_interval(&cb, 1.0, Args::none());
        clock.schedule_interval_soft(&cb, 1.0, Args::none());
        assert_eq!(count.get(), 0);
        clock.unschedule(&cb);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_unschedule_unknown_is_noop() {
        let clock = Clock::new(ManualTime::new(0.0));
        let (cb, _) = counter();
        clock.unschedule(&cb);
        clock.schedule(&cb, Args::none());
        clock.unschedule(&cb);
        clock.unschedule(&cb);
        assert_eq!(clock.every_tick_len(), 0);
        assert!(!clock.is_scheduled(&cb));
    }

    #[test]
    fn test_sleep_time() {
        let time = ManualTime::new(0.0);
        let clock = Clock::new(time.clone());
        assert_eq!(clock.sleep_time(), None);

        let (cb, _) = counter();
        clock.schedule_once(&cb, 3.0, Args::none());
        assert_eq!(clock.sleep_time(), Some(3.0));

        time.set(5.0);
        assert_eq!(clock.sleep_time(), Some(0.0));

        clock.schedule(&cb, Args::none());
        assert_eq!(clock.sleep_time(), Some(0.0));
    }

    #[test]
    fn test_args_forwarded() {
        let clock = Clock::new(ManualTime::new(0.0));
        let seen = Rc::new(Cell::new(0.0));
        let s = seen.clone();
        let cb = Callback::new(move |_, dt, args| {
            let velocity = args.get::<f64>().copied().unwrap_or(0.0);
            s.set(s.get() + dt * velocity);
        });
        clock.schedule_once(&cb, 0.0, Args::new(5.0_f64));
        clock.set_time(2.0);
        clock.call_scheduled_functions(0.0);
        assert_eq!(seen.get(), 10.0);
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = ClockConfig {
            history_window: 0,
            ..Default::default()
        };
        assert!(Clock::with_config(ManualTime::new(0.0), config).is_err());
    }

    #[test]
    fn test_history_window_bounded() {
        let time = ManualTime::new(0.0);
        let config = ClockConfig {
            history_window: 2,
            ..Default::default()
        };
        let clock = Clock::with_config(time.clone(), config).unwrap();
        assert_eq!(clock.average_interval(), 0.0);
        assert_eq!(clock.fps(), 0.0);

        clock.tick();
        for step in [1.0, 1.0, 0.25, 0.25] {
            time.advance(step);
            clock.tick();
        }
        assert_eq!(clock.average_interval(), 0.25);
        assert_eq!(clock.fps(), 4.0);
    }

    #[test]
    fn test_debug_while_borrowed_does_not_panic() {
        let clock = Clock::new(ManualTime::new(0.0));
        let rendered = Rc::new(RefCell::new(String::new()));
        let r = rendered.clone();
        let cb = Callback::new(move |clock, _, _| {
            *r.borrow_mut() = format!("{clock:?}");
        });
        clock.schedule(&cb, Args::none());
        clock.tick();
        assert!(rendered.borrow().starts_with("Clock {"));
    }
}
