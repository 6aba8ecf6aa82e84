//! Footswitch and LED pin setup.
//!
//! Pin mapping on the ATmega32U4:
//!   Footswitch inputs (pull-up, switch to ground): PD0, PD1
//!   LED outputs (Timer1 8-bit fast PWM):          PB5 (OC1A), PB6 (OC1B)

use core::convert::Infallible;

use avr_device::atmega32u4::{Peripherals, PORTD};
use embedded_hal::digital::{ErrorType, InputPin};

/// Number of footswitches on the board.
pub const SWITCHES: usize = 2;

/// PORTD bit for each footswitch.
const SWITCH_BITS: [u8; SWITCHES] = [0, 1];

/// A PORTD input read straight from the PIND register.
pub struct SwitchPin<'a> {
    port: &'a PORTD,
    mask: u8,
}

impl ErrorType for SwitchPin<'_> {
    type Error = Infallible;
}

impl InputPin for SwitchPin<'_> {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.port.pind.read().bits() & self.mask != 0)
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|v| !v)
    }
}

/// Configure the footswitch inputs and hand out one pin per switch.
pub fn init_switches(dp: &Peripherals) -> [SwitchPin<'_>; SWITCHES] {
    let portd = &dp.PORTD;
    let mask = SWITCH_BITS.iter().fold(0u8, |m, &b| m | (1 << b));

    // Inputs with pull-ups
    portd.ddrd.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
    portd.portd.modify(|r, w| unsafe { w.bits(r.bits() | mask) });

    SWITCH_BITS.map(|bit| SwitchPin {
        port: portd,
        mask: 1 << bit,
    })
}

/// Put PB5/PB6 under Timer1 fast PWM, both LEDs dark.
pub fn init_leds(dp: &Peripherals) {
    dp.PORTB.ddrb.modify(|r, w| unsafe { w.bits(r.bits() | 0x60) });

    let tc1 = &dp.TC1;
    tc1.ocr1a.write(|w| unsafe { w.bits(0) });
    tc1.ocr1b.write(|w| unsafe { w.bits(0) });
    // COM1A/COM1B non-inverting, WGM = 0b0101 (8-bit fast PWM), clk/64
    tc1.tccr1a.write(|w| unsafe { w.bits(0b1010_0001) });
    tc1.tccr1b.write(|w| unsafe { w.bits(0b0000_1011) });
}

/// Write an LED duty cycle. `led` is the footswitch index.
pub fn set_led(dp: &Peripherals, led: usize, duty: u8) {
    let tc1 = &dp.TC1;
    match led {
        0 => tc1.ocr1a.write(|w| unsafe { w.bits(u16::from(duty)) }),
        1 => tc1.ocr1b.write(|w| unsafe { w.bits(u16::from(duty)) }),
        _ => {}
    }
}
