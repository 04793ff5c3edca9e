//! Soft scheduling - phase distribution for recurring callbacks
//!
//! Picks a first deadline for an interval entry that keeps it away from
//! deadlines already queued. The search is a binary subdivision of the
//! interval:
//!
//! ```text
//! basis                      basis + interval
//! |--------------------------|
//!   5  3   6   2   7  4  8   1          order of probes
//! ```
//!
//! Probe `1` is tested against a tolerance of `interval / 4`; at
//! subdivision level `k` the `k - 1` probes use `interval / (4k)`.

/// True if some deadline in `sorted` lies within `tolerance` of `ts`.
///
/// `sorted` must be ascending; the scan stops at the first deadline past
/// `ts + tolerance`.
pub fn is_taken(sorted: &[f64], ts: f64, tolerance: f64) -> bool {
    for &next in sorted {
        if (next - ts).abs() <= tolerance {
            return true;
        }
        if next > ts + tolerance {
            return false;
        }
    }
    false
}

/// Choose the next deadline for an entry of period `interval` anchored at
/// `basis`.
///
/// Gives up once the subdivision count exceeds `max_divs` and returns the
/// last probe, even if it collides. With `max_divs >= 2` the result is
/// always past `basis`.
pub fn soft_next_ts(basis: f64, interval: f64, sorted: &[f64], max_divs: u32) -> f64 {
    let mut next_ts = basis + interval;
    if !is_taken(sorted, next_ts, interval / 4.0) {
        return next_ts;
    }

    let mut dt = interval;
    let mut divs: u32 = 1;
    loop {
        next_ts = basis;
        for _ in 1..divs {
            next_ts += dt;
            if !is_taken(sorted, next_ts, dt / 4.0) {
                return next_ts;
            }
        }
        dt /= 2.0;
        divs = divs.saturating_mul(2);

        if divs > max_divs {
            return next_ts;
        }
    }
}
