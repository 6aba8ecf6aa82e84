//! On/off LED state with a fixed brightness.
//!
//! The handler never touches hardware. It reports the PWM duty to write
//! whenever the visible output changes, and the caller owns the timer.

pub struct LedHandler {
    active_low: bool,
    on: bool,
    brightness: u8,
}

impl LedHandler {
    /// Starts off at full brightness.
    pub const fn new(active_low: bool) -> Self {
        Self {
            active_low,
            on: false,
            brightness: 255,
        }
    }

    /// Duty cycle for the current state, inverted for active-low wiring.
    pub fn duty(&self) -> u8 {
        let level = if self.on { self.brightness } else { 0 };
        if self.active_low {
            255 - level
        } else {
            level
        }
    }

    /// Switch the LED, returning the new duty if the state changed.
    pub fn set(&mut self, on: bool) -> Option<u8> {
        if on == self.on {
            return None;
        }
        self.on = on;
        Some(self.duty())
    }

    /// Takes effect immediately when lit, otherwise on the next `set(true)`.
    pub fn set_brightness(&mut self, brightness: u8) -> Option<u8> {
        if brightness == self.brightness {
            return None;
        }
        self.brightness = brightness;
        self.on.then(|| self.duty())
    }
}
