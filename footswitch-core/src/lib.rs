//! Input decoding and HID dispatch for the media footswitch.
//!
//! This crate is `no_std` so the same code runs in the AVR firmware and in
//! the host simulator.
//!
//! Each tick the pipeline runs bottom-up:
//!
//! ```text
//! pin -> Debouncer -> InputHandler -> PressCounter -> CommandIndex -> sender
//! ```
//!
//! [`CommandIndex`] turns a burst of `n` taps into index `n` and a long hold
//! into the maximum index, for exactly one tick per gesture.

#![no_std]

pub mod clock;
pub mod command_index;
pub mod config;
pub mod debounce;
pub mod dispatch;
pub mod footswitch;
pub mod input;
pub mod keycode;
pub mod led;
pub mod press_counter;

pub use clock::{Clock, ManualClock, Millis};
pub use command_index::{CommandIndex, Gesture};
pub use config::TimingConfig;
pub use debounce::Debouncer;
pub use dispatch::{CommandTableError, Dispatcher, HidSink, KeyboardCommand, MediaCommands, Mode};
pub use footswitch::Footswitch;
pub use input::InputHandler;
pub use keycode::{ConsumerKey, Keycode};
pub use led::LedHandler;
pub use press_counter::PressCounter;
