//! USB HID usages the footswitch can send.
//!
//! [`Keycode`] covers the Keyboard/Keypad page (0x07) used in keyboard mode.
//! [`ConsumerKey`] covers the Consumer page (0x0C) media keys used in media
//! mode. Both carry a short display name for host tools.

/// Declare a `#[repr]` usage enum with its display names and a lookup table.
macro_rules! usage_table {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $repr:ident {
            $( $variant:ident = $code:literal => $label:literal, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        #[repr($repr)]
        pub enum $name {
            $( $variant = $code, )*
        }

        impl $name {
            /// Every usage in the table, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )* ];

            /// Raw usage ID as sent in a HID report.
            pub const fn usage(self) -> $repr {
                self as $repr
            }

            /// Short label for layouts and simulator output.
            pub const fn display_name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )*
                }
            }

            /// Look up a usage by variant name or display label, ignoring case.
            pub fn from_name(name: &str) -> Option<Self> {
                $(
                    if name.eq_ignore_ascii_case(stringify!($variant))
                        || name.eq_ignore_ascii_case($label)
                    {
                        return Some($name::$variant);
                    }
                )*
                None
            }
        }
    };
}

usage_table! {
    /// USB HID keycodes.
    /// See USB HID Usage Tables, Section 10 (Keyboard/Keypad Page 0x07).
    pub enum Keycode: u8 {
        A = 0x04 => "A",
        B = 0x05 => "B",
        C = 0x06 => "C",
        D = 0x07 => "D",
        E = 0x08 => "E",
        F = 0x09 => "F",
        G = 0x0A => "G",
        H = 0x0B => "H",
        I = 0x0C => "I",
        J = 0x0D => "J",
        K = 0x0E => "K",
        L = 0x0F => "L",
        M = 0x10 => "M",
        N = 0x11 => "N",
        O = 0x12 => "O",
        P = 0x13 => "P",
        Q = 0x14 => "Q",
        R = 0x15 => "R",
        S = 0x16 => "S",
        T = 0x17 => "T",
        U = 0x18 => "U",
        V = 0x19 => "V",
        W = 0x1A => "W",
        X = 0x1B => "X",
        Y = 0x1C => "Y",
        Z = 0x1D => "Z",
        N1 = 0x1E => "1",
        N2 = 0x1F => "2",
        N3 = 0x20 => "3",
        N4 = 0x21 => "4",
        N5 = 0x22 => "5",
        N6 = 0x23 => "6",
        N7 = 0x24 => "7",
        N8 = 0x25 => "8",
        N9 = 0x26 => "9",
        N0 = 0x27 => "0",
        Enter = 0x28 => "Ent",
        Escape = 0x29 => "Esc",
        Backspace = 0x2A => "Bksp",
        Tab = 0x2B => "Tab",
        Space = 0x2C => "Spc",
        F1 = 0x3A => "F1",
        F2 = 0x3B => "F2",
        F3 = 0x3C => "F3",
        F4 = 0x3D => "F4",
        F5 = 0x3E => "F5",
        F6 = 0x3F => "F6",
        F7 = 0x40 => "F7",
        F8 = 0x41 => "F8",
        F9 = 0x42 => "F9",
        F10 = 0x43 => "F10",
        F11 = 0x44 => "F11",
        F12 = 0x45 => "F12",
        PrintScreen = 0x46 => "PScr",
        ScrollLock = 0x47 => "ScrL",
        Pause = 0x48 => "Paus",
        Insert = 0x49 => "Ins",
        Home = 0x4A => "Home",
        PageUp = 0x4B => "PgUp",
        Delete = 0x4C => "Del",
        End = 0x4D => "End",
        PageDown = 0x4E => "PgDn",
        Right = 0x4F => "Right",
        Left = 0x50 => "Left",
        Down = 0x51 => "Down",
        Up = 0x52 => "Up",
        F13 = 0x68 => "F13",
        F14 = 0x69 => "F14",
        F15 = 0x6A => "F15",
        F16 = 0x6B => "F16",
        F17 = 0x6C => "F17",
        F18 = 0x6D => "F18",
        F19 = 0x6E => "F19",
        F20 = 0x6F => "F20",
        F21 = 0x70 => "F21",
        F22 = 0x71 => "F22",
        F23 = 0x72 => "F23",
        F24 = 0x73 => "F24",
        LCtrl = 0xE0 => "Ctrl",
        LShift = 0xE1 => "Shft",
        LAlt = 0xE2 => "Alt",
        LGui = 0xE3 => "Gui",
        RCtrl = 0xE4 => "RCtl",
        RShift = 0xE5 => "RSft",
        RAlt = 0xE6 => "RAlt",
        RGui = 0xE7 => "RGui",
    }
}

impl Keycode {
    /// Check if this keycode is a modifier (LCtrl..RGui).
    pub fn is_modifier(self) -> bool {
        (0xE0..=0xE7).contains(&self.usage())
    }

    /// Modifier bit mask (bit 0 = LCtrl, bit 7 = RGui), 0 for ordinary keys.
    pub fn modifier_bit(self) -> u8 {
        if self.is_modifier() {
            1 << (self.usage() - 0xE0)
        } else {
            0
        }
    }
}

usage_table! {
    /// Consumer control usages.
    /// See USB HID Usage Tables, Section 15 (Consumer Page 0x0C).
    pub enum ConsumerKey: u16 {
        ScanNext = 0xB5 => "Next",
        ScanPrevious = 0xB6 => "Prev",
        Stop = 0xB7 => "Stop",
        PlayPause = 0xCD => "Play",
        Mute = 0xE2 => "Mute",
        VolumeUp = 0xE9 => "Vol+",
        VolumeDown = 0xEA => "Vol-",
    }
}
