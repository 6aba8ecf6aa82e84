//! Millisecond counter on Timer0.
//!
//! Timer0 runs in CTC mode at 1 kHz (16 MHz / 64 / 250) and the compare
//! interrupt bumps a counter shared with the main loop.

use core::cell::Cell;

use avr_device::atmega32u4::TC0;
use avr_device::interrupt::Mutex;
use footswitch_core::{Clock, Millis};

const PRESCALER_64_TOP: u8 = 249;

static MILLIS: Mutex<Cell<Millis>> = Mutex::new(Cell::new(0));

#[avr_device::interrupt(atmega32u4)]
fn TIMER0_COMPA() {
    avr_device::interrupt::free(|cs| {
        let counter = MILLIS.borrow(cs);
        counter.set(counter.get().wrapping_add(1));
    });
}

/// Read-only handle to the Timer0 millisecond counter.
pub struct SystemClock;

impl SystemClock {
    /// Start Timer0. Interrupts must be enabled separately.
    pub fn init(tc0: &TC0) -> Self {
        tc0.tccr0a.write(|w| w.wgm0().ctc());
        tc0.ocr0a.write(|w| unsafe { w.bits(PRESCALER_64_TOP) });
        tc0.tccr0b.write(|w| w.cs0().prescale_64());
        tc0.timsk0.write(|w| w.ocie0a().set_bit());

        avr_device::interrupt::free(|cs| MILLIS.borrow(cs).set(0));
        Self
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        avr_device::interrupt::free(|cs| MILLIS.borrow(cs).get())
    }
}
