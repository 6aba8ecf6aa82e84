//! Turn decoded input into HID key presses.
//!
//! Two senders share one [`HidSink`]: [`MediaCommands`] maps a command index
//! to a consumer (media) key, and [`KeyboardCommand`] mirrors the switch onto
//! a single keyboard key. Which one runs is chosen by the [`Dispatcher`]'s
//! [`Mode`], held as plain state rather than shared between buttons.

use core::fmt;

use embedded_hal::digital::InputPin;
use heapless::Vec;

use crate::input::InputHandler;
use crate::keycode::{ConsumerKey, Keycode};

/// HID transport. The firmware implements this on its report builder, host
/// tools on a recorder.
pub trait HidSink {
    fn press_key(&mut self, key: Keycode);
    fn release_key(&mut self, key: Keycode);
    fn press_consumer(&mut self, key: ConsumerKey);
    fn release_consumer(&mut self, key: ConsumerKey);
    /// Release every key on every report.
    fn release_all(&mut self);
}

/// Output mode for all buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Tap counts and holds select media keys.
    Media,
    /// The switch acts as one keyboard key.
    Keyboard,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Media => Mode::Keyboard,
            Mode::Keyboard => Mode::Media,
        }
    }

    /// Decode a stored mode byte. Only 0 (media) and 1 (keyboard) are valid.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Mode::Media),
            1 => Some(Mode::Keyboard),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Mode::Media => 0,
            Mode::Keyboard => 1,
        }
    }
}

/// Rejected command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTableError {
    /// Fewer entries than the table holds. The existing table is kept.
    TooFew { given: usize, required: usize },
}

impl fmt::Display for CommandTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CommandTableError::TooFew { given, required } => write!(
                f,
                "command table has {} entries, {} required",
                given, required
            ),
        }
    }
}

impl core::error::Error for CommandTableError {}

/// Media key per command index: index `n` presses entry `n - 1`.
pub struct MediaCommands<const N: usize> {
    commands: Vec<ConsumerKey, N>,
    last_command: u8,
}

impl<const N: usize> MediaCommands<N> {
    /// Starts with play/pause on a single tap.
    pub fn new() -> Self {
        let mut commands = Vec::new();
        if N > 0 {
            let _ = commands.push(ConsumerKey::PlayPause);
        }
        Self {
            commands,
            last_command: 0,
        }
    }

    /// Replace the table with the first `N` entries of `cmds`.
    pub fn set_commands(&mut self, cmds: &[ConsumerKey]) -> Result<(), CommandTableError> {
        if cmds.len() < N {
            log::warn!("media: ignoring command table of {} entries, need {}", cmds.len(), N);
            return Err(CommandTableError::TooFew {
                given: cmds.len(),
                required: N,
            });
        }

        self.commands.clear();
        for &cmd in cmds.iter().take(N) {
            let _ = self.commands.push(cmd);
        }
        Ok(())
    }

    pub fn commands(&self) -> &[ConsumerKey] {
        &self.commands
    }

    /// Command for a 1-based index, if the table has one.
    pub fn lookup(&self, index: u8) -> Option<ConsumerKey> {
        usize::from(index)
            .checked_sub(1)
            .and_then(|i| self.commands.get(i))
            .copied()
    }

    /// Press the key for `index` and release the previous one when it changes.
    pub fn run<S: HidSink>(&mut self, index: u8, sink: &mut S) {
        let command = if usize::from(index) > N { 0 } else { index };

        if command != self.last_command {
            if let Some(key) = self.lookup(self.last_command) {
                sink.release_consumer(key);
            }
            if let Some(key) = self.lookup(command) {
                log::debug!("media: press {}", key.display_name());
                sink.press_consumer(key);
            }
        }

        self.last_command = command;
    }

    /// Forget the held command without touching the sink, after the sink has
    /// already released everything.
    pub fn clear(&mut self) {
        self.last_command = 0;
    }
}

impl<const N: usize> Default for MediaCommands<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// One keyboard key that follows the switch.
pub struct KeyboardCommand {
    command: Keycode,
}

impl KeyboardCommand {
    pub const fn new(command: Keycode) -> Self {
        Self { command }
    }

    pub fn set_command(&mut self, cmd: Keycode) {
        self.command = cmd;
    }

    pub fn command(&self) -> Keycode {
        self.command
    }

    pub fn run<P: InputPin, S: HidSink>(&mut self, input: &InputHandler<P>, sink: &mut S) {
        if input.rising() {
            sink.press_key(self.command);
        } else if input.falling() {
            sink.release_key(self.command);
        }
    }
}

impl Default for KeyboardCommand {
    fn default() -> Self {
        Self::new(Keycode::Space)
    }
}

/// Owns the output mode.
pub struct Dispatcher {
    mode: Mode,
    begun: bool,
}

impl Dispatcher {
    pub const fn new(mode: Mode) -> Self {
        Self { mode, begun: false }
    }

    /// Mark the transport as live. Mode changes release keys from here on.
    pub fn begin<S: HidSink>(&mut self, sink: &mut S) {
        self.begun = true;
        sink.release_all();
    }

    /// Switch modes, releasing anything the old mode still holds.
    pub fn set_mode<S: HidSink>(&mut self, mode: Mode, sink: &mut S) {
        if mode == self.mode {
            return;
        }
        log::debug!("dispatch: mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;

        if self.begun {
            sink.release_all();
        }
    }

    pub fn switch_mode<S: HidSink>(&mut self, sink: &mut S) {
        self.set_mode(self.mode.toggled(), sink);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}
