//! Multi-tap burst counting.
//!
//! Each rising edge adds one to the count. Holding the switch keeps the
//! burst open; once it has been released for longer than the timeout the
//! burst is marked finished. The next rising edge after a finished burst
//! starts a new count from one.

use embedded_hal::digital::InputPin;

use crate::clock::{elapsed, Millis};
use crate::input::InputHandler;

pub struct PressCounter {
    timeout: Millis,
    finished: bool,
    /// Last time the switch was seen held while a burst was open.
    last_update: Millis,
    count: u8,
}

impl PressCounter {
    pub const fn new(timeout: Millis) -> Self {
        Self {
            timeout,
            finished: false,
            last_update: 0,
            count: 0,
        }
    }

    /// Advance the counter. Call once per tick after `input.update()`.
    pub fn check<P: InputPin>(&mut self, input: &InputHandler<P>) {
        let now = input.now();

        if input.rising() {
            if self.finished {
                self.count = 0;
            }
            self.finished = false;
            self.count = self.count.saturating_add(1);
            log::trace!("press: count {} at {}ms", self.count, now);
        }

        if self.count > 0 {
            if input.state() {
                self.last_update = now;
            } else if elapsed(now, self.last_update) > self.timeout {
                if !self.finished {
                    log::trace!("press: burst of {} done at {}ms", self.count, now);
                }
                self.finished = true;
            }
        }
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn is_done(&self) -> bool {
        self.finished
    }

    /// Clear the count and push the timeout baseline back one full window.
    pub fn reset(&mut self, now: Millis) {
        self.count = 0;
        self.last_update = now.wrapping_sub(self.timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::tests::CellPin;
    use core::cell::Cell;

    /// Step the input and counter at `t` with the switch pressed or not.
    fn tick(
        input: &mut InputHandler<CellPin<'_>>,
        counter: &mut PressCounter,
        level: &Cell<bool>,
        pressed: bool,
        t: Millis,
    ) {
        // Pull-up wiring: pressed reads low.
        level.set(!pressed);
        input.update(t);
        counter.check(input);
    }

    #[test]
    fn test_counts_taps_and_finishes_after_timeout() {
        let level = Cell::new(true);
        let mut input = InputHandler::new(CellPin(&level), true, 5);
        let mut counter = PressCounter::new(300);

        tick(&mut input, &mut counter, &level, true, 0);
        tick(&mut input, &mut counter, &level, false, 50);
        tick(&mut input, &mut counter, &level, true, 150);
        tick(&mut input, &mut counter, &level, false, 200);
        assert_eq!(counter.count(), 2);
        assert!(!counter.is_done());

        // Last refresh was at 150 while held; 450 is exactly the timeout.
        tick(&mut input, &mut counter, &level, false, 450);
        assert!(!counter.is_done());
        tick(&mut input, &mut counter, &level, false, 451);
        assert!(counter.is_done());
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_holding_never_times_out() {
        let level = Cell::new(true);
        let mut input = InputHandler::new(CellPin(&level), true, 5);
        let mut counter = PressCounter::new(300);

        tick(&mut input, &mut counter, &level, true, 0);
        for t in (10..2000).step_by(10) {
            tick(&mut input, &mut counter, &level, true, t);
        }
        assert!(!counter.is_done());
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_new_burst_restarts_at_one() {
        let level = Cell::new(true);
        let mut input = InputHandler::new(CellPin(&level), true, 5);
        let mut counter = PressCounter::new(300);

        tick(&mut input, &mut counter, &level, true, 0);
        tick(&mut input, &mut counter, &level, false, 50);
        tick(&mut input, &mut counter, &level, true, 100);
        tick(&mut input, &mut counter, &level, false, 150);
        tick(&mut input, &mut counter, &level, false, 500);
        assert!(counter.is_done());
        assert_eq!(counter.count(), 2);

        tick(&mut input, &mut counter, &level, true, 600);
        assert_eq!(counter.count(), 1);
        assert!(!counter.is_done());
    }

    #[test]
    fn test_reset_clears_count() {
        let level = Cell::new(true);
        let mut input = InputHandler::new(CellPin(&level), true, 5);
        let mut counter = PressCounter::new(300);

        tick(&mut input, &mut counter, &level, true, 0);
        counter.reset(10);
        assert_eq!(counter.count(), 0);
        tick(&mut input, &mut counter, &level, false, 2000);
        assert!(!counter.is_done());
    }
}
