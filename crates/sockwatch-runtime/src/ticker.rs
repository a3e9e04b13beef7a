//! Fixed-period tick deadlines.
//!
//! When a collection overruns one or more periods the missed deadlines are
//! collapsed into a single due tick and the schedule realigns on the period
//! grid. Ticks are never queued.

use std::time::{Duration, Instant};

/// Smallest accepted period.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A due tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Deadlines that passed unserved and were folded into this tick.
    pub coalesced: u32,
}

/// Deadline tracker for the sampling loop.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    /// Creates a ticker whose first deadline is one period after `now`.
    #[must_use]
    pub fn new(period: Duration, now: Instant) -> Self {
        let period = period.max(MIN_PERIOD);
        Self {
            period,
            next: now + period,
        }
    }

    /// The fixed period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// The next deadline.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.next
    }

    /// Time left until the next deadline, zero if it already passed.
    #[must_use]
    pub fn time_until(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Moves the next deadline to `delay` after `now`.
    ///
    /// Used when the data source dictates its own pacing.
    pub fn reschedule(&mut self, delay: Duration, now: Instant) {
        self.next = now + delay;
    }

    /// Returns the due tick, if any, and advances the deadline past `now`.
    pub fn poll(&mut self, now: Instant) -> Option<Tick> {
        if now < self.next {
            return None;
        }
        let late = now.duration_since(self.next).as_nanos() / self.period.as_nanos();
        let coalesced = u32::try_from(late).unwrap_or(u32::MAX);
        let steps = u32::try_from(late + 1).unwrap_or(u32::MAX);
        self.next += self.period.saturating_mul(steps);
        if coalesced > 0 {
            tracing::debug!(coalesced, "collection overran the tick period");
        }
        Some(Tick { coalesced })
    }
}
