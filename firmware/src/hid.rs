//! USB HID keyboard + consumer control for the ATmega32U4.
//!
//! One HID interface carries two reports on a single interrupt IN endpoint:
//! report 1 is a 6KRO keyboard report, report 2 a single consumer usage for
//! media keys. Uses direct register access via avr-device.

use avr_device::atmega32u4::Peripherals;
use footswitch_core::{ConsumerKey, HidSink, Keycode};

const KEYBOARD_REPORT_ID: u8 = 1;
const CONSUMER_REPORT_ID: u8 = 2;

/// Keyboard report body (after the report ID).
/// Byte 0: modifier keys bitmask
/// Byte 1: reserved (0x00)
/// Bytes 2-7: up to 6 simultaneous keycodes
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub keys: [u8; 6],
}

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self {
            modifiers: 0,
            keys: [0; 6],
        }
    }

    fn to_bytes(self) -> [u8; 9] {
        let mut out = [0u8; 9];
        out[0] = KEYBOARD_REPORT_ID;
        out[1] = self.modifiers;
        out[3..].copy_from_slice(&self.keys);
        out
    }
}

/// Pending output state, built up by the footswitches each tick.
pub struct HidReports {
    keyboard: KeyboardReport,
    consumer: u16,
}

impl HidReports {
    pub const fn new() -> Self {
        Self {
            keyboard: KeyboardReport::empty(),
            consumer: 0,
        }
    }
}

impl HidSink for HidReports {
    fn press_key(&mut self, key: Keycode) {
        if key.is_modifier() {
            self.keyboard.modifiers |= key.modifier_bit();
            return;
        }
        let code = key.usage();
        if self.keyboard.keys.contains(&code) {
            return;
        }
        // More than 6 keys are silently dropped
        if let Some(slot) = self.keyboard.keys.iter_mut().find(|k| **k == 0) {
            *slot = code;
        }
    }

    fn release_key(&mut self, key: Keycode) {
        if key.is_modifier() {
            self.keyboard.modifiers &= !key.modifier_bit();
            return;
        }
        let code = key.usage();
        for slot in self.keyboard.keys.iter_mut().filter(|k| **k == code) {
            *slot = 0;
        }
    }

    fn press_consumer(&mut self, key: ConsumerKey) {
        self.consumer = key.usage();
    }

    fn release_consumer(&mut self, key: ConsumerKey) {
        if self.consumer == key.usage() {
            self.consumer = 0;
        }
    }

    fn release_all(&mut self) {
        self.keyboard = KeyboardReport::empty();
        self.consumer = 0;
    }
}

// ============================================================================
// ATmega32U4 USB Register-Level Driver
// ============================================================================

const EP0_SIZE: u8 = 64; // Control endpoint size
const EP1_SIZE: u8 = 16; // Interrupt IN endpoint size (largest report + ID)

/// HID report descriptor: keyboard (ID 1) and consumer control (ID 2).
static HID_REPORT_DESCRIPTOR: [u8; 73] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x85, KEYBOARD_REPORT_ID, // Report ID
    // Modifier keys (8 bits)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224) - LCtrl
    0x29, 0xE7, //   Usage Maximum (231) - RGui
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // Reserved byte
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant)
    // Keycodes (6 bytes)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x85, CONSUMER_REPORT_ID, // Report ID
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x03, // Logical Maximum (1023)
    0x19, 0x00, //   Usage Minimum (0)
    0x2A, 0xFF, 0x03, // Usage Maximum (1023)
    0x75, 0x10, //   Report Size (16)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
];

// USB descriptors
static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,   // bLength
    1,    // bDescriptorType (Device)
    0x00, 0x02, // bcdUSB (2.0)
    0,    // bDeviceClass (defined at interface level)
    0,    // bDeviceSubClass
    0,    // bDeviceProtocol
    EP0_SIZE, // bMaxPacketSize0
    0xC0, 0x16, // idVendor (0x16C0, Van Ooijen Technische Informatica)
    0xDB, 0x27, // idProduct (0x27DB, shared HID keyboard)
    0x01, 0x00, // bcdDevice (1.0)
    1,    // iManufacturer
    2,    // iProduct
    0,    // iSerialNumber
    1,    // bNumConfigurations
];

static CONFIG_DESCRIPTOR: [u8; 34] = [
    // Configuration descriptor
    9,    // bLength
    2,    // bDescriptorType (Configuration)
    34, 0, // wTotalLength
    1,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0x80, // bmAttributes (bus powered)
    50,   // bMaxPower (100mA)
    // Interface descriptor
    9,    // bLength
    4,    // bDescriptorType (Interface)
    0,    // bInterfaceNumber
    0,    // bAlternateSetting
    1,    // bNumEndpoints
    3,    // bInterfaceClass (HID)
    0,    // bInterfaceSubClass (none: report IDs rule out the boot protocol)
    0,    // bInterfaceProtocol
    0,    // iInterface
    // HID descriptor
    9,    // bLength
    0x21, // bDescriptorType (HID)
    0x11, 0x01, // bcdHID (1.11)
    0,    // bCountryCode
    1,    // bNumDescriptors
    0x22, // bDescriptorType (Report)
    HID_REPORT_DESCRIPTOR.len() as u8, 0, // wDescriptorLength
    // Endpoint descriptor (EP1 IN, interrupt)
    7,    // bLength
    5,    // bDescriptorType (Endpoint)
    0x81, // bEndpointAddress (EP1 IN)
    0x03, // bmAttributes (Interrupt)
    EP1_SIZE, 0, // wMaxPacketSize
    1,    // bInterval (1ms polling, a media pulse may be one tick long)
];

/// Build a UTF-16LE string descriptor from ASCII text.
const fn string_descriptor<const N: usize>(text: &str) -> [u8; N] {
    let bytes = text.as_bytes();
    let mut out = [0u8; N];
    out[0] = N as u8;
    out[1] = 3;
    let mut i = 0;
    while i < bytes.len() && 3 + 2 * i < N {
        out[2 + 2 * i] = bytes[i];
        i += 1;
    }
    out
}

/// String descriptor 0 (language ID)
static STRING_DESC_0: [u8; 4] = [4, 3, 0x09, 0x04]; // English (US)
static STRING_DESC_1: [u8; 22] = string_descriptor("Footswitch");
static STRING_DESC_2: [u8; 34] = string_descriptor("Media Footswitch");

/// USB device state.
pub struct UsbHid {
    configured: bool,
    last_keyboard: KeyboardReport,
    last_consumer: u16,
}

impl UsbHid {
    pub const fn new() -> Self {
        Self {
            configured: false,
            last_keyboard: KeyboardReport::empty(),
            last_consumer: 0,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Initialize the ATmega32U4 USB controller.
    pub fn init(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        // Enable USB pad regulator
        usb.uhwcon.write(|w| w.uvrege().set_bit());

        // Enable USB controller and VBUS pad
        usb.usbcon
            .write(|w| w.usbe().set_bit().otgpade().set_bit());

        // 16MHz crystal -> PLL -> 48MHz USB clock
        dp.PLL.pllcsr.write(|w| w.pindiv().set_bit().plle().set_bit());
        while dp.PLL.pllcsr.read().plock().bit_is_clear() {}

        usb.usbcon.modify(|_, w| w.frzclk().clear_bit());

        // Attach to bus
        usb.udcon.modify(|_, w| w.detach().clear_bit());

        usb.udien.write(|w| w.eorste().set_bit());

        self.configured = false;
    }

    /// Poll for USB events and handle them. Call this once per tick.
    pub fn poll(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        if usb.udint.read().eorsti().bit_is_set() {
            usb.udint.modify(|_, w| w.eorsti().clear_bit());
            self.configure_ep0(dp);
            self.configured = false;
        }

        self.select_endpoint(dp, 0);
        if usb.ueintx.read().rxstpi().bit_is_set() {
            self.handle_setup(dp);
        }
    }

    /// Send whichever reports changed since the last call.
    pub fn send_reports(&mut self, dp: &Peripherals, reports: &HidReports) {
        if !self.configured {
            return;
        }

        if reports.keyboard != self.last_keyboard
            && self.write_report(dp, &reports.keyboard.to_bytes())
        {
            self.last_keyboard = reports.keyboard;
        }

        if reports.consumer != self.last_consumer {
            let [lo, hi] = reports.consumer.to_le_bytes();
            if self.write_report(dp, &[CONSUMER_REPORT_ID, lo, hi]) {
                self.last_consumer = reports.consumer;
            }
        }
    }

    /// Queue one report on EP1. Returns false if the endpoint stayed busy.
    fn write_report(&self, dp: &Peripherals, bytes: &[u8]) -> bool {
        let usb = &dp.USB_DEVICE;
        self.select_endpoint(dp, 1);

        // Wait for endpoint ready (RWAL set means we can write)
        let mut timeout: u16 = 0xFFFF;
        while usb.ueintx.read().rwal().bit_is_clear() {
            timeout = timeout.wrapping_sub(1);
            if timeout == 0 {
                return false;
            }
        }

        for &byte in bytes {
            usb.uedatx.write(|w| w.bits(byte));
        }

        // Clear FIFOCON and TXINI to send
        usb.ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());
        true
    }

    fn configure_ep0(&self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        self.select_endpoint(dp, 0);
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b00));
        usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
    }

    fn configure_ep1(&self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        self.select_endpoint(dp, 1);
        usb.ueconx.write(|w| w.epen().set_bit());
        // Interrupt IN endpoint, 16 bytes
        usb.uecfg0x
            .write(|w| w.eptype().bits(0b11).epdir().set_bit());
        usb.uecfg1x.write(|w| w.epsize().bits(0b001).alloc().set_bit());
    }

    fn select_endpoint(&self, dp: &Peripherals, ep: u8) {
        dp.USB_DEVICE
            .uenum
            .write(|w| w.bits(ep & 0x07));
    }

    fn handle_setup(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        let mut setup = [0u8; 8];
        for byte in setup.iter_mut() {
            *byte = usb.uedatx.read().bits();
        }
        let [bm_request_type, b_request, w_value_l, w_value_h, _, _, w_length_l, w_length_h] =
            setup;

        usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());

        let w_length = u16::from_le_bytes([w_length_l, w_length_h]);

        match (bm_request_type, b_request) {
            // GET_DESCRIPTOR
            (0x80, 0x06) => match (w_value_h, w_value_l) {
                (1, _) => self.send_descriptor(dp, &DEVICE_DESCRIPTOR, w_length),
                (2, _) => self.send_descriptor(dp, &CONFIG_DESCRIPTOR, w_length),
                (3, 0) => self.send_descriptor(dp, &STRING_DESC_0, w_length),
                (3, 1) => self.send_descriptor(dp, &STRING_DESC_1, w_length),
                (3, 2) => self.send_descriptor(dp, &STRING_DESC_2, w_length),
                _ => self.stall(dp),
            },

            // SET_ADDRESS
            (0x00, 0x05) => {
                // ZLP first, then latch the address
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.udaddr
                    .write(|w| w.uadd().bits(w_value_l & 0x7F).adden().set_bit());
            }

            // SET_CONFIGURATION
            (0x00, 0x09) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                self.configure_ep1(dp);
                self.configured = true;
            }

            // GET_CONFIGURATION
            (0x80, 0x08) => {
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.uedatx.write(|w| w.bits(u8::from(self.configured)));
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            // HID GET_DESCRIPTOR (interface-level)
            (0x81, 0x06) => match w_value_h {
                0x22 => self.send_descriptor(dp, &HID_REPORT_DESCRIPTOR, w_length),
                _ => self.stall(dp),
            },

            // HID SET_IDLE / SET_PROTOCOL
            (0x21, 0x0A) | (0x21, 0x0B) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            // Vendor request: jump to bootloader
            (0x40, 0xFF) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                jump_to_bootloader(dp);
            }

            _ => self.stall(dp),
        }
    }

    fn send_descriptor(&self, dp: &Peripherals, desc: &[u8], max_length: u16) {
        let usb = &dp.USB_DEVICE;
        let len = core::cmp::min(desc.len(), usize::from(max_length));

        for chunk in desc[..len].chunks(usize::from(EP0_SIZE)) {
            while usb.ueintx.read().txini().bit_is_clear() {}
            for &byte in chunk {
                usb.uedatx.write(|w| w.bits(byte));
            }
            usb.ueintx.modify(|_, w| w.txini().clear_bit());
        }

        // Status stage (host sends ZLP)
        while usb.ueintx.read().rxouti().bit_is_clear() {}
        usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
    }

    fn stall(&self, dp: &Peripherals) {
        dp.USB_DEVICE
            .ueconx
            .modify(|_, w| w.stallrq().set_bit());
    }
}

/// Disable the peripherals in use and jump to the HalfKay bootloader at 0x7E00.
fn jump_to_bootloader(dp: &Peripherals) -> ! {
    avr_device::interrupt::disable();

    // Disconnect USB
    dp.USB_DEVICE.udcon.write(|w| w.detach().set_bit());
    dp.USB_DEVICE.usbcon.write(|w| w.frzclk().set_bit());

    // Give the host time to notice the disconnect
    for _ in 0..20000u16 {
        unsafe { core::arch::asm!("nop") };
    }

    // Stop the tick timer and LED PWM
    dp.TC0.timsk0.write(|w| unsafe { w.bits(0) });
    dp.TC0.tccr0b.write(|w| unsafe { w.bits(0) });
    dp.TC1.tccr1a.write(|w| unsafe { w.bits(0) });
    dp.TC1.tccr1b.write(|w| unsafe { w.bits(0) });

    // Release the switch and LED pins
    dp.PORTB.ddrb.write(|w| unsafe { w.bits(0) });
    dp.PORTB.portb.write(|w| unsafe { w.bits(0) });
    dp.PORTD.ddrd.write(|w| unsafe { w.bits(0) });
    dp.PORTD.portd.write(|w| unsafe { w.bits(0) });

    unsafe { core::arch::asm!("jmp 0x7E00", options(noreturn)) }
}
