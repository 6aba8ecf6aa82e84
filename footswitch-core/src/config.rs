//! Timing configuration shared by every button pipeline.

use crate::clock::Millis;

/// Fixed at construction; pipelines never change it at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Minimum time between accepted contact transitions.
    pub debounce_ms: Millis,
    /// Release time after which a tap burst is complete.
    pub burst_timeout_ms: Millis,
    /// Press duration that counts as a hold.
    pub hold_ms: Millis,
    /// Highest command index; taps above it are clamped and a hold reports it.
    pub max_index: u8,
}

impl TimingConfig {
    pub const DEFAULT: Self = Self::new(5, 300, 1000, 3);

    pub const fn new(debounce_ms: Millis, burst_timeout_ms: Millis, hold_ms: Millis, max_index: u8) -> Self {
        Self {
            debounce_ms,
            burst_timeout_ms,
            hold_ms,
            max_index,
        }
    }

    pub const fn with_debounce_ms(mut self, ms: Millis) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub const fn with_burst_timeout_ms(mut self, ms: Millis) -> Self {
        self.burst_timeout_ms = ms;
        self
    }

    pub const fn with_hold_ms(mut self, ms: Millis) -> Self {
        self.hold_ms = ms;
        self
    }

    pub const fn with_max_index(mut self, max_index: u8) -> Self {
        self.max_index = max_index;
        self
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
