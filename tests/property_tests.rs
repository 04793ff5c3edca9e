//! Property-based tests for the clock.
//!
//! Tick steps and intervals are drawn as multiples of powers of two so the
//! scheduling arithmetic stays exact.

use frame_clock::{Args, Callback, Clock, ManualTime};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Records the tick time of every invocation.
fn recorder() -> (Callback, Rc<RefCell<Vec<f64>>>) {
    let fired = Rc::new(RefCell::new(Vec::new()));
    let f = fired.clone();
    let cb = Callback::new(move |clock, _, _| {
        if let Some(ts) = clock.last_ts() {
            f.borrow_mut().push(ts);
        }
    });
    (cb, fired)
}

fn steps() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((1u32..=512).prop_map(|n| f64::from(n) / 1024.0), 1..200)
}

fn interval() -> impl Strategy<Value = f64> {
    (1u32..=64).prop_map(|n| f64::from(n) / 64.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A one-shot never fires before its deadline, and fires at the first
    /// tick at or past it.
    #[test]
    fn prop_once_never_early(delay in interval(), steps in steps()) {
        let time = ManualTime::new(0.0);
        let clock = Clock::new(time.clone());
        let (cb, fired) = recorder();
        clock.schedule_once(&cb, delay, Args::none());

        let mut crossed = None;
        for step in steps {
            time.advance(step);
            clock.tick();
            if crossed.is_none() && time.get() >= delay {
                crossed = Some(time.get());
            }
        }

        let fired = fired.borrow();
        if let Some(ts) = crossed {
            prop_assert_eq!(&*fired, &vec![ts]);
        } else {
            prop_assert!(fired.is_empty());
        }
    }

    /// Interval callbacks fire at most once per tick and never replay
    /// missed periods.
    #[test]
    fn prop_interval_no_catch_up(period in interval(), steps in steps()) {
        let time = ManualTime::new(0.0);
        let clock = Clock::new(time.clone());
        let (cb, fired) = recorder();
        clock.schedule_interval(&cb, period, Args::none());

        let mut ticks = 0usize;
        for step in steps {
            time.advance(step);
            clock.tick();
            ticks += 1;
        }

        let fired = fired.borrow();
        prop_assert!(fired.len() <= ticks);
        prop_assert!(fired.windows(2).all(|w| w[1] - w[0] >= period),
            "fires closer than one period: {:?}", *fired);
        let elapsed = time.get();
        prop_assert!(fired.len() as f64 * period <= elapsed,
            "{} fires of {period}s in {elapsed}s", fired.len());
        if let Some(first) = fired.first() {
            prop_assert!(*first >= period);
        }
    }

    /// With a fixed step that divides the period, an interval callback fires
    /// exactly once per elapsed period: no bursts and no misses.
    #[test]
    fn prop_interval_exact_count(
        period in interval(),
        split in 1u32..=5,
        ticks in 1u32..400,
    ) {
        let per_period = 1u32 << split;
        let step = period / f64::from(per_period);
        let time = ManualTime::new(0.0);
        let clock = Clock::new(time.clone());
        let (cb, fired) = recorder();
        clock.schedule_interval(&cb, period, Args::none());

        for _ in 0..ticks {
            time.advance(step);
            clock.tick();
        }

        let expected = (ticks / per_period) as usize;
        prop_assert_eq!(fired.borrow().len(), expected,
            "period {} step {} ticks {}", period, step, ticks);
    }

    /// Nothing registered with a callback runs after it is unscheduled.
    #[test]
    fn prop_unschedule_is_final(
        period in interval(),
        before in steps(),
        after in steps(),
    ) {
        let time = ManualTime::new(0.0);
        let clock = Clock::new(time.clone());
        let (cb, fired) = recorder();
        clock.schedule(&cb, Args::none());
        clock.schedule_once(&cb, period, Args::none());
        clock.schedule_interval(&cb, period, Args::none());
        clock.schedule_interval_soft(&cb, period, Args::none());

        for step in before {
            time.advance(step);
            clock.tick();
        }
        clock.unschedule(&cb);
        let count = fired.borrow().len();
        prop_assert!(!clock.is_scheduled(&cb));

        for step in after {
            time.advance(step);
            clock.tick();
        }
        prop_assert_eq!(fired.borrow().len(), count);
        prop_assert_eq!(clock.pending_len(), 0);
        prop_assert_eq!(clock.every_tick_len(), 0);
    }

    /// Up to sixteen soft entries of one period land on distinct deadlines
    /// within one period of the basis.
    #[test]
    fn prop_soft_spreads_within_period(
        start in 0u32..1000,
        period in interval(),
        n in 1usize..=16,
    ) {
        let basis = f64::from(start);
        let clock = Clock::new(ManualTime::new(basis));
        let noop = Callback::from_dt(|_| {});
        for _ in 0..n {
            clock.schedule_interval_soft(&noop, period, Args::none());
        }

        let deadlines = clock.pending_deadlines();
        prop_assert_eq!(deadlines.len(), n);
        prop_assert!(deadlines.windows(2).all(|w| w[0] < w[1]),
            "duplicate deadlines: {deadlines:?}");
        prop_assert!(deadlines.iter().all(|d| *d > basis && *d <= basis + period),
            "deadline outside ({basis}, {}]: {deadlines:?}", basis + period);
    }

    /// The dt passed to every-tick callbacks is what `tick()` returned.
    #[test]
    fn prop_every_tick_dt_matches(steps in steps()) {
        let time = ManualTime::new(0.0);
        let clock = Clock::new(time.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let cb = Callback::from_dt(move |dt| s.borrow_mut().push(dt));
        clock.schedule(&cb, Args::none());

        let mut returned = vec![clock.tick()];
        for step in steps {
            time.advance(step);
            returned.push(clock.tick());
        }
        prop_assert_eq!(&*seen.borrow(), &returned);
        prop_assert_eq!(returned[0], 0.0);
    }
}
