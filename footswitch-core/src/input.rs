//! Debounced switch input with tick-granular edge detection.
//!
//! [`InputHandler::update`] must run exactly once per polling tick before any
//! query. Every query answers for the most recent update only, so `rising`
//! and `falling` report a transition between the previous tick and this one,
//! not the moment the contact actually moved.

use embedded_hal::digital::{Error as _, InputPin};

use crate::clock::Millis;
use crate::debounce::Debouncer;

pub struct InputHandler<P> {
    pin: P,
    /// Pin reads high when released (pull-up wiring, switch to ground).
    active_low: bool,
    bounce: Debouncer,
    /// Logical state at the end of the previous tick.
    last_state: bool,
    /// Timestamp of the most recent update.
    now: Millis,
}

impl<P: InputPin> InputHandler<P> {
    /// Wrap an already-configured input pin.
    ///
    /// The debouncer starts at the pin's idle level so power-up never reads
    /// as a press.
    pub fn new(pin: P, active_low: bool, debounce_ms: Millis) -> Self {
        Self {
            pin,
            active_low,
            bounce: Debouncer::new(debounce_ms, active_low),
            last_state: false,
            now: 0,
        }
    }

    /// Sample the pin for this tick.
    pub fn update(&mut self, now: Millis) {
        self.last_state = self.state();
        self.now = now;

        let raw = match self.pin.is_high() {
            Ok(level) => level,
            Err(e) => {
                log::warn!("input: pin read failed ({:?}), holding level", e.kind());
                self.bounce.state()
            }
        };
        self.bounce.debounce(raw, now);
    }

    /// True while the switch is pressed, whatever the wiring polarity.
    pub fn state(&self) -> bool {
        self.bounce.state() != self.active_low
    }

    pub fn changed(&self) -> bool {
        self.state() != self.last_state
    }

    pub fn rising(&self) -> bool {
        self.changed() && self.state()
    }

    pub fn falling(&self) -> bool {
        self.changed() && !self.state()
    }

    /// How long the current logical state has been held, as of the last update.
    pub fn held_for(&self) -> Millis {
        self.bounce.held_for(self.now)
    }

    /// Timestamp of the last update.
    pub fn now(&self) -> Millis {
        self.now
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    /// Pin whose level is driven by the test through a shared cell.
    pub(crate) struct CellPin<'a>(pub &'a Cell<bool>);

    impl ErrorType for CellPin<'_> {
        type Error = Infallible;
    }

    impl InputPin for CellPin<'_> {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0.get())
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0.get())
        }
    }

    #[test]
    fn test_pullup_idle_is_released() {
        let level = Cell::new(true);
        let mut input = InputHandler::new(CellPin(&level), true, 5);
        input.update(0);
        assert!(!input.state());
        assert!(!input.changed());
    }

    #[test]
    fn test_pullup_press_is_logical_true() {
        let level = Cell::new(true);
        let mut input = InputHandler::new(CellPin(&level), true, 5);
        input.update(0);
        level.set(false);
        input.update(1);
        assert!(input.state());
        assert!(input.rising());
        assert!(!input.falling());
    }

    #[test]
    fn test_active_high_wiring() {
        let level = Cell::new(false);
        let mut input = InputHandler::new(CellPin(&level), false, 5);
        input.update(0);
        assert!(!input.state());
        level.set(true);
        input.update(1);
        assert!(input.rising());
    }

    #[test]
    fn test_rising_reported_for_one_tick_only() {
        let level = Cell::new(true);
        let mut input = InputHandler::new(CellPin(&level), true, 5);
        input.update(0);
        level.set(false);
        input.update(1);
        assert!(input.rising());
        input.update(2);
        assert!(input.state());
        assert!(!input.rising());
    }

    #[test]
    fn test_falling_after_release() {
        let level = Cell::new(true);
        let mut input = InputHandler::new(CellPin(&level), true, 5);
        input.update(0);
        level.set(false);
        input.update(1);
        level.set(true);
        input.update(20);
        assert!(input.falling());
        assert!(!input.state());
    }

    #[test]
    fn test_held_for_tracks_tick_time() {
        let level = Cell::new(true);
        let mut input = InputHandler::new(CellPin(&level), true, 5);
        input.update(0);
        level.set(false);
        input.update(100);
        input.update(350);
        assert_eq!(input.held_for(), 250);
    }
}
