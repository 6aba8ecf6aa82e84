//! One physical footswitch: input pipeline, LED and both command senders.
//!
//! Each footswitch owns its own pipeline. Several of them can be polled one
//! after another from the same loop without sharing any timing state.

use embedded_hal::digital::InputPin;

use crate::clock::Millis;
use crate::command_index::CommandIndex;
use crate::config::TimingConfig;
use crate::dispatch::{CommandTableError, HidSink, KeyboardCommand, MediaCommands, Mode};
use crate::input::InputHandler;
use crate::keycode::{ConsumerKey, Keycode};
use crate::led::LedHandler;

pub struct Footswitch<P, const N: usize> {
    input: InputHandler<P>,
    index: CommandIndex,
    led: LedHandler,
    media: MediaCommands<N>,
    keyboard: KeyboardCommand,
}

impl<P: InputPin, const N: usize> Footswitch<P, N> {
    pub fn new(pin: P, active_low: bool, led_active_low: bool, config: &TimingConfig) -> Self {
        Self {
            input: InputHandler::new(pin, active_low, config.debounce_ms),
            index: CommandIndex::from_config(config),
            led: LedHandler::new(led_active_low),
            media: MediaCommands::new(),
            keyboard: KeyboardCommand::default(),
        }
    }

    pub fn set_media_commands(&mut self, cmds: &[ConsumerKey]) -> Result<(), CommandTableError> {
        self.media.set_commands(cmds)
    }

    pub fn set_keyboard_command(&mut self, key: Keycode) {
        self.keyboard.set_command(key);
    }

    /// Poll the switch for this tick and advance the decoder.
    ///
    /// Returns the LED duty to write when the LED should change.
    pub fn check_input(&mut self, now: Millis) -> Option<u8> {
        self.input.update(now);
        self.index.update(&self.input);
        self.led.set(self.input.state())
    }

    /// Send whatever this tick decoded, using the sender for `mode`.
    pub fn run_commands<S: HidSink>(&mut self, mode: Mode, sink: &mut S) {
        match mode {
            Mode::Media => self.media.run(self.index.index(), sink),
            Mode::Keyboard => self.keyboard.run(&self.input, sink),
        }
    }

    /// Drop any held media command after the sink released everything.
    pub fn clear_held(&mut self) {
        self.media.clear();
    }

    pub fn set_brightness(&mut self, brightness: u8) -> Option<u8> {
        self.led.set_brightness(brightness)
    }

    pub fn is_pressed(&self) -> bool {
        self.input.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::{Event, Recorder};
    use crate::input::tests::CellPin;
    use core::cell::Cell;

    fn run_ms<const N: usize>(
        fs: &mut Footswitch<CellPin<'_>, N>,
        level: &Cell<bool>,
        pressed: bool,
        mode: Mode,
        sink: &mut Recorder,
        t: &mut Millis,
        ms: Millis,
    ) {
        level.set(!pressed);
        for _ in 0..ms {
            fs.check_input(*t);
            fs.run_commands(mode, sink);
            *t += 1;
        }
    }

    #[test]
    fn test_double_tap_presses_second_media_key() {
        let level = Cell::new(true);
        let mut fs: Footswitch<_, 3> = Footswitch::new(CellPin(&level), true, false, &TimingConfig::DEFAULT);
        fs.set_media_commands(&[ConsumerKey::PlayPause, ConsumerKey::ScanNext, ConsumerKey::Mute])
            .unwrap();
        let mut sink = Recorder::default();
        let mut t = 0;

        run_ms(&mut fs, &level, true, Mode::Media, &mut sink, &mut t, 60);
        run_ms(&mut fs, &level, false, Mode::Media, &mut sink, &mut t, 60);
        run_ms(&mut fs, &level, true, Mode::Media, &mut sink, &mut t, 60);
        run_ms(&mut fs, &level, false, Mode::Media, &mut sink, &mut t, 500);

        assert_eq!(
            sink.events.as_slice(),
            &[
                Event::PressConsumer(ConsumerKey::ScanNext),
                Event::ReleaseConsumer(ConsumerKey::ScanNext),
            ]
        );
    }

    #[test]
    fn test_keyboard_mode_follows_switch() {
        let level = Cell::new(true);
        let mut fs: Footswitch<_, 3> = Footswitch::new(CellPin(&level), true, false, &TimingConfig::DEFAULT);
        fs.set_keyboard_command(Keycode::F13);
        let mut sink = Recorder::default();
        let mut t = 0;

        run_ms(&mut fs, &level, true, Mode::Keyboard, &mut sink, &mut t, 1500);
        run_ms(&mut fs, &level, false, Mode::Keyboard, &mut sink, &mut t, 500);

        assert_eq!(
            sink.events.as_slice(),
            &[Event::PressKey(Keycode::F13), Event::ReleaseKey(Keycode::F13)]
        );
    }

    #[test]
    fn test_led_follows_debounced_state() {
        let level = Cell::new(true);
        let mut fs: Footswitch<_, 3> = Footswitch::new(CellPin(&level), true, false, &TimingConfig::DEFAULT);

        assert_eq!(fs.check_input(0), None);
        level.set(false);
        assert_eq!(fs.check_input(1), Some(255));
        assert!(fs.is_pressed());
        level.set(true);
        // Still inside the debounce window.
        assert_eq!(fs.check_input(3), None);
        assert_eq!(fs.check_input(6), Some(0));
    }
}
