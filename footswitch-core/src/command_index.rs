//! Collapse tap bursts and long holds into a single command index.
//!
//! Every tick produces one index. It is zero unless a gesture completed on
//! that very tick:
//!
//! - a finished burst of `n` taps reports `min(n, max_index)`,
//! - a press held for at least the hold threshold reports `max_index`.
//!
//! A finished burst is checked before the hold, so a burst that completes on
//! the same tick the threshold is crossed reports its tap count. A hold is
//! reported once and then latched until the switch is released, and it
//! discards any taps counted so far so releasing does not emit them too.

use embedded_hal::digital::InputPin;

use crate::clock::Millis;
use crate::config::TimingConfig;
use crate::input::InputHandler;
use crate::press_counter::PressCounter;

/// What the pipeline decoded on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Nothing completed this tick.
    Idle,
    /// A burst of taps finished. Carries the clamped tap count.
    Burst(u8),
    /// The hold threshold was crossed.
    Hold,
}

pub struct CommandIndex {
    max_count: u8,
    hold_time: Millis,
    counter: PressCounter,
    index: u8,
    gesture: Gesture,
    /// Set once a hold has been reported, cleared on release.
    hold_latched: bool,
}

impl CommandIndex {
    pub const fn new(max_count: u8, repeat_timeout: Millis, hold_time: Millis) -> Self {
        Self {
            max_count,
            hold_time,
            counter: PressCounter::new(repeat_timeout),
            index: 0,
            gesture: Gesture::Idle,
            hold_latched: false,
        }
    }

    pub const fn from_config(config: &TimingConfig) -> Self {
        Self::new(config.max_index, config.burst_timeout_ms, config.hold_ms)
    }

    /// Advance the pipeline. Call once per tick after `input.update()`.
    pub fn update<P: InputPin>(&mut self, input: &InputHandler<P>) {
        self.counter.check(input);
        self.gesture = self.decode(input);
        self.index = match self.gesture {
            Gesture::Idle => 0,
            Gesture::Burst(n) => n,
            Gesture::Hold => self.max_count,
        };

        if self.gesture != Gesture::Idle {
            log::debug!("command: {:?} -> index {}", self.gesture, self.index);
        }
    }

    fn decode<P: InputPin>(&mut self, input: &InputHandler<P>) -> Gesture {
        let now = input.now();

        if !input.state() {
            self.hold_latched = false;
        }

        // A finished burst stays finished until the next press; only report it once.
        if self.counter.is_done() && self.counter.count() > 0 {
            let taps = self.counter.count().min(self.max_count);
            self.counter.reset(now);
            Gesture::Burst(taps)
        } else if input.state() && input.held_for() >= self.hold_time && !self.hold_latched {
            self.hold_latched = true;
            self.counter.reset(now);
            Gesture::Hold
        } else {
            Gesture::Idle
        }
    }

    /// Index decoded on the last update, 0 when nothing completed.
    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Taps counted so far in the burst in progress.
    pub fn pending_taps(&self) -> u8 {
        self.counter.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::tests::CellPin;
    use core::cell::Cell;

    struct Rig<'a> {
        level: &'a Cell<bool>,
        input: InputHandler<CellPin<'a>>,
        index: CommandIndex,
        t: Millis,
    }

    impl<'a> Rig<'a> {
        fn new(level: &'a Cell<bool>) -> Self {
            Self {
                level,
                input: InputHandler::new(CellPin(level), true, 5),
                index: CommandIndex::new(3, 300, 1000),
                t: 0,
            }
        }

        /// Run 1ms ticks for `ms` with the switch pressed or released,
        /// collecting every non-zero index.
        fn run(&mut self, pressed: bool, ms: Millis, out: &mut heapless::Vec<(Millis, u8), 16>) {
            self.level.set(!pressed);
            for _ in 0..ms {
                self.input.update(self.t);
                self.index.update(&self.input);
                if self.index.index() != 0 {
                    let _ = out.push((self.t, self.index.index()));
                }
                self.t += 1;
            }
        }
    }

    #[test]
    fn test_double_tap_reports_two_once() {
        let level = Cell::new(true);
        let mut rig = Rig::new(&level);
        let mut out = heapless::Vec::new();

        rig.run(false, 10, &mut out);
        rig.run(true, 80, &mut out);
        rig.run(false, 100, &mut out);
        rig.run(true, 80, &mut out);
        rig.run(false, 600, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1, 2);
        assert_eq!(rig.index.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_taps_clamped_to_max() {
        let level = Cell::new(true);
        let mut rig = Rig::new(&level);
        let mut out = heapless::Vec::new();

        for _ in 0..5 {
            rig.run(true, 40, &mut out);
            rig.run(false, 60, &mut out);
        }
        rig.run(false, 400, &mut out);

        // Last press ends at 439, so the burst times out at 740.
        assert_eq!(out.as_slice(), &[(740, 3)]);
    }

    #[test]
    fn test_hold_reports_max_once_and_nothing_on_release() {
        let level = Cell::new(true);
        let mut rig = Rig::new(&level);
        let mut out = heapless::Vec::new();

        rig.run(false, 10, &mut out);
        rig.run(true, 1200, &mut out);
        assert_eq!(out.as_slice(), &[(1010, 3)]);

        rig.run(false, 1000, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_hold_after_tap_cancels_taps() {
        let level = Cell::new(true);
        let mut rig = Rig::new(&level);
        let mut out = heapless::Vec::new();

        rig.run(false, 10, &mut out);
        rig.run(true, 50, &mut out);
        rig.run(false, 100, &mut out);
        assert_eq!(rig.index.pending_taps(), 1);

        rig.run(true, 1500, &mut out);
        rig.run(false, 1000, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1, 3);
        assert_eq!(rig.index.pending_taps(), 0);
    }

    #[test]
    fn test_second_hold_reported_after_release() {
        let level = Cell::new(true);
        let mut rig = Rig::new(&level);
        let mut out = heapless::Vec::new();

        rig.run(true, 1100, &mut out);
        rig.run(false, 500, &mut out);
        rig.run(true, 1100, &mut out);

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|&(_, i)| i == 3));
    }

    #[test]
    fn test_index_pulse_lasts_one_tick() {
        let level = Cell::new(true);
        let mut rig = Rig::new(&level);
        let mut out = heapless::Vec::new();

        rig.run(true, 50, &mut out);
        rig.run(false, 302, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(rig.index.index(), 0);
    }
}
