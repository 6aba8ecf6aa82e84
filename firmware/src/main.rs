//! Two-button USB media footswitch firmware for ATmega32U4 (Teensy 2.0).
//!
//! - Debounced footswitch inputs with tap-count and hold gestures
//! - Media mode: gesture index selects a consumer key per switch
//! - Keyboard mode: each switch acts as one held key
//! - LED per switch, lit while pressed
//!
//! Hold footswitch A while plugging in to start in keyboard mode.

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod clock;
mod hid;
mod pins;

use avr_device::atmega32u4::Peripherals;
use footswitch_core::{Clock, ConsumerKey, Dispatcher, Footswitch, Keycode, Millis, Mode, TimingConfig};

use clock::SystemClock;
use hid::{HidReports, UsbHid};
use pins::SwitchPin;

const CONFIG: TimingConfig = TimingConfig::DEFAULT;
const COMMANDS: usize = CONFIG.max_index as usize;

/// Both switches short to ground; both LEDs are driven high.
const SWITCH_ACTIVE_LOW: bool = true;
const LED_ACTIVE_LOW: bool = false;

/// 1 tap, 2 taps, 3 taps or hold.
const MEDIA_A: [ConsumerKey; COMMANDS] = [
    ConsumerKey::PlayPause,
    ConsumerKey::ScanNext,
    ConsumerKey::ScanPrevious,
];
const MEDIA_B: [ConsumerKey; COMMANDS] = [
    ConsumerKey::VolumeUp,
    ConsumerKey::VolumeDown,
    ConsumerKey::Mute,
];

const KEY_A: Keycode = Keycode::Space;
const KEY_B: Keycode = Keycode::Enter;

/// How long switch A is sampled at power-up for the mode select.
const MODE_SELECT_MS: Millis = 50;

/// LEDs run dimmer in keyboard mode so the mode is visible.
const KEYBOARD_BRIGHTNESS: u8 = 48;

type Switch<'a> = Footswitch<SwitchPin<'a>, COMMANDS>;

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Disable clock prescaler (16MHz from the Teensy fuses)
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    let clock = SystemClock::init(&dp.TC0);
    unsafe { avr_device::interrupt::enable() };

    pins::init_leds(&dp);
    let [pin_a, pin_b] = pins::init_switches(&dp);

    let mut switches: [Switch<'_>; pins::SWITCHES] = [
        build_switch(pin_a, &MEDIA_A, KEY_A),
        build_switch(pin_b, &MEDIA_B, KEY_B),
    ];

    let mut reports = HidReports::new();
    let mut dispatcher = Dispatcher::new(Mode::Media);

    // Let the debouncer settle, then read switch A
    let mut now = clock.now_ms();
    while now < MODE_SELECT_MS {
        for (i, sw) in switches.iter_mut().enumerate() {
            if let Some(duty) = sw.check_input(now) {
                pins::set_led(&dp, i, duty);
            }
        }
        now = clock.now_ms();
    }
    if switches[0].is_pressed() {
        dispatcher.switch_mode(&mut reports);
        for (i, sw) in switches.iter_mut().enumerate() {
            sw.clear_held();
            if let Some(duty) = sw.set_brightness(KEYBOARD_BRIGHTNESS) {
                pins::set_led(&dp, i, duty);
            }
        }
    }

    let mut usb = UsbHid::new();
    usb.init(&dp);

    let mut begun = false;
    let mut last_tick = now;

    loop {
        usb.poll(&dp);

        if usb.is_configured() && !begun {
            dispatcher.begin(&mut reports);
            begun = true;
        }

        let now = clock.now_ms();
        if now == last_tick {
            continue;
        }
        last_tick = now;

        for (i, sw) in switches.iter_mut().enumerate() {
            if let Some(duty) = sw.check_input(now) {
                pins::set_led(&dp, i, duty);
            }
            sw.run_commands(dispatcher.mode(), &mut reports);
        }

        usb.send_reports(&dp, &reports);
    }
}

fn build_switch<'a>(pin: SwitchPin<'a>, media: &[ConsumerKey], key: Keycode) -> Switch<'a> {
    let mut sw = Footswitch::new(pin, SWITCH_ACTIVE_LOW, LED_ACTIVE_LOW, &CONFIG);
    // Tables are exactly COMMANDS long, so this cannot be rejected
    let _ = sw.set_media_commands(media);
    sw.set_keyboard_command(key);
    sw
}
