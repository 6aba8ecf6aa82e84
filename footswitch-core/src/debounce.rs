//! Window-based contact debounce.
//!
//! After an accepted transition the debouncer ignores the raw input for a
//! fixed window. Once the window has passed, the next sample that differs
//! from the accepted state is taken immediately, with no check that the new
//! level is itself stable. A single bounce burst is assumed to settle inside
//! the window.

use crate::clock::{elapsed, Millis};

pub struct Debouncer {
    /// Accepted level.
    state: bool,
    /// Time of the last accepted transition.
    last_change: Millis,
    /// Minimum time between accepted transitions.
    window: Millis,
}

impl Debouncer {
    /// Create a debouncer that starts at `initial`. With a clock counting up
    /// from 0 the very first differing sample is accepted.
    pub const fn new(window: Millis, initial: bool) -> Self {
        Self {
            state: initial,
            last_change: 0u32.wrapping_sub(window),
            window,
        }
    }

    /// True while the window since the last accepted change is still open.
    pub fn bouncing(&self, now: Millis) -> bool {
        elapsed(now, self.last_change) < self.window
    }

    /// Feed one raw sample taken at `now`.
    pub fn debounce(&mut self, raw: bool, now: Millis) {
        if raw == self.state || self.bouncing(now) {
            return;
        }
        self.state = raw;
        self.last_change = now;
        log::debug!("debounce: accepted {} at {}ms", raw, now);
    }

    pub fn state(&self) -> bool {
        self.state
    }

    /// Time since the last accepted transition.
    pub fn held_for(&self, now: Millis) -> Millis {
        elapsed(now, self.last_change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_change_accepted_immediately() {
        let mut d = Debouncer::new(5, false);
        d.debounce(true, 0);
        assert!(d.state());
    }

    #[test]
    fn test_toggles_inside_window_dropped() {
        let mut d = Debouncer::new(5, false);
        d.debounce(true, 100);
        d.debounce(false, 101);
        d.debounce(true, 102);
        d.debounce(false, 104);
        assert!(d.state());
        assert_eq!(d.held_for(104), 4);
    }

    #[test]
    fn test_change_at_window_boundary_accepted() {
        let mut d = Debouncer::new(5, false);
        d.debounce(true, 100);
        d.debounce(false, 105);
        assert!(!d.state());
    }

    #[test]
    fn test_late_change_flips_without_revalidation() {
        let mut d = Debouncer::new(5, false);
        d.debounce(true, 100);
        // A single glitch well after the window is taken as-is.
        d.debounce(false, 500);
        assert!(!d.state());
        d.debounce(true, 501);
        assert!(!d.state());
    }

    #[test]
    fn test_window_across_clock_wrap() {
        let mut d = Debouncer::new(5, false);
        d.debounce(true, 1000);
        d.debounce(false, u32::MAX - 1);
        assert!(!d.state());
        // 3ms after the change, across the wrap
        d.debounce(true, 1);
        assert!(!d.state());
        d.debounce(true, 3);
        assert!(d.state());
    }

    #[test]
    fn test_first_change_held_off_just_below_wrap() {
        // The initial baseline sits one window before 0, so a clock that
        // starts in the last window before the wrap still waits it out.
        let mut d = Debouncer::new(5, false);
        d.debounce(true, u32::MAX - 1);
        assert!(!d.state());
        d.debounce(true, 0);
        assert!(d.state());
    }
}
