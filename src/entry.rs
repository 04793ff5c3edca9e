//! Scheduled entries
//!
//! A [`Callback`] is a cloneable handle compared by identity, so the same
//! handle can be registered many times and unscheduled in one call.
//! [`Args`] is the opaque payload forwarded to it on every invocation.

use crate::clock::Clock;
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

type CallbackFn = dyn Fn(&Clock, f64, &Args);

/// A host callback: `(clock, dt, args)`.
///
/// Clones share identity; two handles built from identical closures do not.
#[derive(Clone)]
pub struct Callback(Rc<CallbackFn>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Clock, f64, &Args) + 'static,
    {
        Self(Rc::new(f))
    }

    /// Build a callback that only cares about the elapsed time.
    pub fn from_dt<F>(f: F) -> Self
    where
        F: Fn(f64) + 'static,
    {
        Self::new(move |_, dt, _| f(dt))
    }

    /// True if both handles refer to the same callback.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn call(&self, clock: &Clock, dt: f64, args: &Args) {
        (self.0)(clock, dt, args)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// Opaque payload handed back to the callback unchanged.
#[derive(Clone, Default)]
pub struct Args(Option<Rc<dyn Any>>);

impl Args {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new<T: Any>(value: T) -> Self {
        Self(Some(Rc::new(value)))
    }

    /// Borrow the payload as `T`, if it is one.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Args(none)")
        } else {
            f.write_str("Args(..)")
        }
    }
}

/// One pending callback.
///
/// Every-tick entries leave the timing fields at zero. Timed entries are
/// re-armed in place, so the timestamps live in cells.
pub(crate) struct ScheduledEntry {
    pub callback: Callback,
    pub args: Args,
    /// 0 marks a one-shot.
    pub interval: f64,
    pub last_ts: Cell<f64>,
    pub next_ts: Cell<f64>,
    cancelled: Cell<bool>,
}

impl ScheduledEntry {
    pub fn every_tick(callback: Callback, args: Args) -> Rc<Self> {
        Self::timed(callback, args, 0.0, 0.0, 0.0)
    }

    pub fn timed(
        callback: Callback,
        args: Args,
        interval: f64,
        last_ts: f64,
        next_ts: f64,
    ) -> Rc<Self> {
        Rc::new(Self {
            callback,
            args,
            interval,
            last_ts: Cell::new(last_ts),
            next_ts: Cell::new(next_ts),
            cancelled: Cell::new(false),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    /// Neutralize the entry. Any snapshot still holding it will skip it.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn matches(&self, callback: &Callback) -> bool {
        self.callback.ptr_eq(callback)
    }

    pub fn is_repeating(&self) -> bool {
        self.interval > 0.0
    }
}

impl fmt::Debug for ScheduledEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledEntry")
            .field("callback", &self.callback)
            .field("interval", &self.interval)
            .field("last_ts", &self.last_ts.get())
            .field("next_ts", &self.next_ts.get())
            .field("cancelled", &self.cancelled.get())
            .finish()
    }
}
