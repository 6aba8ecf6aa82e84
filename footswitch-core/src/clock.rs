//! Millisecond time source.
//!
//! All timestamps are `u32` milliseconds since boot and wrap after ~49 days.
//! Durations are always computed with [`elapsed`] so a wrap between two
//! readings still yields the correct difference.

use core::cell::Cell;

/// Milliseconds since boot.
pub type Millis = u32;

/// Monotonic millisecond counter.
pub trait Clock {
    /// Current time in milliseconds. May wrap.
    fn now_ms(&self) -> Millis;
}

/// Time elapsed from `since` to `now`, tolerant of counter wraparound.
#[inline]
pub fn elapsed(now: Millis, since: Millis) -> Millis {
    now.wrapping_sub(since)
}

/// A clock that only moves when told to.
///
/// Used by host tools and tests to replay input at a chosen tick rate.
#[derive(Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    pub const fn new(start: Millis) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Move the clock forward by `ms`, wrapping like a hardware counter.
    pub fn advance(&self, ms: Millis) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn set(&self, ms: Millis) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}
