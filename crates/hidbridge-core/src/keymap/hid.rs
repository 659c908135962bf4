//! USB HID Usage IDs (page 0x07, Keyboard/Keypad page).
//!
//! These are the key codes that travel inside the 6-slot key array of a
//! keyboard report. The combined report descriptor declares a usage range of
//! 0–101 (0x00–0x65), so every variant here fits in that range.
//!
//! Reference: USB HID Usage Tables 1.3, Section 10 (Keyboard/Keypad page 0x07).
//!
//! # What is a HID Usage ID? (for beginners)
//!
//! The **USB Human Interface Device (HID)** standard assigns a unique number to
//! every key on a keyboard. For example:
//!
//! | Key          | HID Usage ID |
//! |--------------|-------------|
//! | Letter A     | 0x04        |
//! | Letter B     | 0x05        |
//! | Enter        | 0x28        |
//! | Space        | 0x2C        |
//!
//! Notice that HID codes for letters start at 0x04 (not at 'A'=0x41 like ASCII).
//! HID codes represent **physical key positions**, not characters. Uppercase
//! `A` is the same key as lowercase `a`, pressed with the Shift modifier.
//!
//! Modifier keys (Ctrl, Shift, Alt, GUI) are *not* listed here: in a boot
//! keyboard report they live in the separate modifier byte, see
//! [`crate::keymap::modifiers::Modifiers`].

use serde::{Deserialize, Serialize};

/// Highest usage ID declared by the report descriptor's key array (101).
pub const MAX_KEY_CODE: u8 = 0x65;

/// USB HID Usage ID for keyboard keys (page 0x07).
///
/// The numeric value of each variant is its HID Usage ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HidKeyCode {
    // Letters (HID 0x04–0x1D)
    KeyA = 0x04,
    KeyB = 0x05,
    KeyC = 0x06,
    KeyD = 0x07,
    KeyE = 0x08,
    KeyF = 0x09,
    KeyG = 0x0A,
    KeyH = 0x0B,
    KeyI = 0x0C,
    KeyJ = 0x0D,
    KeyK = 0x0E,
    KeyL = 0x0F,
    KeyM = 0x10,
    KeyN = 0x11,
    KeyO = 0x12,
    KeyP = 0x13,
    KeyQ = 0x14,
    KeyR = 0x15,
    KeyS = 0x16,
    KeyT = 0x17,
    KeyU = 0x18,
    KeyV = 0x19,
    KeyW = 0x1A,
    KeyX = 0x1B,
    KeyY = 0x1C,
    KeyZ = 0x1D,

    // Digits (HID 0x1E–0x27)
    Digit1 = 0x1E,
    Digit2 = 0x1F,
    Digit3 = 0x20,
    Digit4 = 0x21,
    Digit5 = 0x22,
    Digit6 = 0x23,
    Digit7 = 0x24,
    Digit8 = 0x25,
    Digit9 = 0x26,
    Digit0 = 0x27,

    // Control keys (HID 0x28–0x38)
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    BracketLeft = 0x2F,
    BracketRight = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Backquote = 0x35,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,

    // Lock keys
    CapsLock = 0x39,

    // Function keys (HID 0x3A–0x45)
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,

    // Navigation cluster (HID 0x46–0x52)
    PrintScreen = 0x46,
    ScrollLock = 0x47,
    Pause = 0x48,
    Insert = 0x49,
    Home = 0x4A,
    PageUp = 0x4B,
    Delete = 0x4C,
    End = 0x4D,
    PageDown = 0x4E,
    ArrowRight = 0x4F,
    ArrowLeft = 0x50,
    ArrowDown = 0x51,
    ArrowUp = 0x52,

    // Numpad (HID 0x53–0x63)
    NumLock = 0x53,
    NumpadDivide = 0x54,
    NumpadMultiply = 0x55,
    NumpadSubtract = 0x56,
    NumpadAdd = 0x57,
    NumpadEnter = 0x58,
    Numpad1 = 0x59,
    Numpad2 = 0x5A,
    Numpad3 = 0x5B,
    Numpad4 = 0x5C,
    Numpad5 = 0x5D,
    Numpad6 = 0x5E,
    Numpad7 = 0x5F,
    Numpad8 = 0x60,
    Numpad9 = 0x61,
    Numpad0 = 0x62,
    NumpadDecimal = 0x63,

    // Application key (HID 0x65)
    ContextMenu = 0x65,
}

/// Every key code together with its canonical lowercase name.
///
/// The name is what `KEY <name>` accepts on the control socket.
const KEY_NAMES: &[(HidKeyCode, &str)] = &[
    (HidKeyCode::KeyA, "a"),
    (HidKeyCode::KeyB, "b"),
    (HidKeyCode::KeyC, "c"),
    (HidKeyCode::KeyD, "d"),
    (HidKeyCode::KeyE, "e"),
    (HidKeyCode::KeyF, "f"),
    (HidKeyCode::KeyG, "g"),
    (HidKeyCode::KeyH, "h"),
    (HidKeyCode::KeyI, "i"),
    (HidKeyCode::KeyJ, "j"),
    (HidKeyCode::KeyK, "k"),
    (HidKeyCode::KeyL, "l"),
    (HidKeyCode::KeyM, "m"),
    (HidKeyCode::KeyN, "n"),
    (HidKeyCode::KeyO, "o"),
    (HidKeyCode::KeyP, "p"),
    (HidKeyCode::KeyQ, "q"),
    (HidKeyCode::KeyR, "r"),
    (HidKeyCode::KeyS, "s"),
    (HidKeyCode::KeyT, "t"),
    (HidKeyCode::KeyU, "u"),
    (HidKeyCode::KeyV, "v"),
    (HidKeyCode::KeyW, "w"),
    (HidKeyCode::KeyX, "x"),
    (HidKeyCode::KeyY, "y"),
    (HidKeyCode::KeyZ, "z"),
    (HidKeyCode::Digit1, "1"),
    (HidKeyCode::Digit2, "2"),
    (HidKeyCode::Digit3, "3"),
    (HidKeyCode::Digit4, "4"),
    (HidKeyCode::Digit5, "5"),
    (HidKeyCode::Digit6, "6"),
    (HidKeyCode::Digit7, "7"),
    (HidKeyCode::Digit8, "8"),
    (HidKeyCode::Digit9, "9"),
    (HidKeyCode::Digit0, "0"),
    (HidKeyCode::Enter, "enter"),
    (HidKeyCode::Escape, "escape"),
    (HidKeyCode::Backspace, "backspace"),
    (HidKeyCode::Tab, "tab"),
    (HidKeyCode::Space, "space"),
    (HidKeyCode::Minus, "minus"),
    (HidKeyCode::Equal, "equal"),
    (HidKeyCode::BracketLeft, "bracketleft"),
    (HidKeyCode::BracketRight, "bracketright"),
    (HidKeyCode::Backslash, "backslash"),
    (HidKeyCode::Semicolon, "semicolon"),
    (HidKeyCode::Quote, "quote"),
    (HidKeyCode::Backquote, "backquote"),
    (HidKeyCode::Comma, "comma"),
    (HidKeyCode::Period, "period"),
    (HidKeyCode::Slash, "slash"),
    (HidKeyCode::CapsLock, "capslock"),
    (HidKeyCode::F1, "f1"),
    (HidKeyCode::F2, "f2"),
    (HidKeyCode::F3, "f3"),
    (HidKeyCode::F4, "f4"),
    (HidKeyCode::F5, "f5"),
    (HidKeyCode::F6, "f6"),
    (HidKeyCode::F7, "f7"),
    (HidKeyCode::F8, "f8"),
    (HidKeyCode::F9, "f9"),
    (HidKeyCode::F10, "f10"),
    (HidKeyCode::F11, "f11"),
    (HidKeyCode::F12, "f12"),
    (HidKeyCode::PrintScreen, "printscreen"),
    (HidKeyCode::ScrollLock, "scrolllock"),
    (HidKeyCode::Pause, "pause"),
    (HidKeyCode::Insert, "insert"),
    (HidKeyCode::Home, "home"),
    (HidKeyCode::PageUp, "pageup"),
    (HidKeyCode::Delete, "delete"),
    (HidKeyCode::End, "end"),
    (HidKeyCode::PageDown, "pagedown"),
    (HidKeyCode::ArrowRight, "right"),
    (HidKeyCode::ArrowLeft, "left"),
    (HidKeyCode::ArrowDown, "down"),
    (HidKeyCode::ArrowUp, "up"),
    (HidKeyCode::NumLock, "numlock"),
    (HidKeyCode::NumpadDivide, "kpdivide"),
    (HidKeyCode::NumpadMultiply, "kpmultiply"),
    (HidKeyCode::NumpadSubtract, "kpsubtract"),
    (HidKeyCode::NumpadAdd, "kpadd"),
    (HidKeyCode::NumpadEnter, "kpenter"),
    (HidKeyCode::Numpad1, "kp1"),
    (HidKeyCode::Numpad2, "kp2"),
    (HidKeyCode::Numpad3, "kp3"),
    (HidKeyCode::Numpad4, "kp4"),
    (HidKeyCode::Numpad5, "kp5"),
    (HidKeyCode::Numpad6, "kp6"),
    (HidKeyCode::Numpad7, "kp7"),
    (HidKeyCode::Numpad8, "kp8"),
    (HidKeyCode::Numpad9, "kp9"),
    (HidKeyCode::Numpad0, "kp0"),
    (HidKeyCode::NumpadDecimal, "kpdecimal"),
    (HidKeyCode::ContextMenu, "menu"),
];

/// Alternative spellings accepted by [`HidKeyCode::from_name`].
const KEY_ALIASES: &[(&str, HidKeyCode)] = &[
    ("return", HidKeyCode::Enter),
    ("esc", HidKeyCode::Escape),
    ("bksp", HidKeyCode::Backspace),
    ("del", HidKeyCode::Delete),
    ("ins", HidKeyCode::Insert),
    ("pgup", HidKeyCode::PageUp),
    ("pgdn", HidKeyCode::PageDown),
    ("prtsc", HidKeyCode::PrintScreen),
    ("arrowup", HidKeyCode::ArrowUp),
    ("arrowdown", HidKeyCode::ArrowDown),
    ("arrowleft", HidKeyCode::ArrowLeft),
    ("arrowright", HidKeyCode::ArrowRight),
    ("application", HidKeyCode::ContextMenu),
];

impl HidKeyCode {
    /// Converts a raw HID Usage ID to a [`HidKeyCode`].
    ///
    /// Returns `None` for 0x00 (no key), for unassigned IDs such as 0x32,
    /// and for anything above [`MAX_KEY_CODE`].
    pub fn from_u8(value: u8) -> Option<Self> {
        KEY_NAMES
            .iter()
            .find(|(code, _)| *code as u8 == value)
            .map(|(code, _)| *code)
    }

    /// Returns the raw USB HID Usage ID value for this key code.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the canonical lowercase name of this key (e.g. `"enter"`).
    pub fn name(self) -> &'static str {
        KEY_NAMES
            .iter()
            .find(|(code, _)| *code == self)
            .map(|(_, name)| *name)
            .unwrap_or("")
    }

    /// Looks up a key by name, case-insensitively.
    ///
    /// Accepts the canonical names (`"f5"`, `"pageup"`, `"a"`) and a handful of
    /// common aliases (`"esc"`, `"return"`, `"del"`). Single printable
    /// characters resolve through the text table, so `"!"` yields `Digit1`.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if let Some((code, _)) = KEY_NAMES.iter().find(|(_, n)| *n == lower) {
            return Some(*code);
        }
        if let Some((_, code)) = KEY_ALIASES.iter().find(|(alias, _)| *alias == lower) {
            return Some(*code);
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => crate::keymap::char_to_stroke(ch).map(|stroke| stroke.code),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Standard HID key codes that must have valid from_u8/as_u8 round-trips.
    const STANDARD_KEYS: &[(u8, HidKeyCode)] = &[
        (0x04, HidKeyCode::KeyA),
        (0x05, HidKeyCode::KeyB),
        (0x1E, HidKeyCode::Digit1),
        (0x27, HidKeyCode::Digit0),
        (0x28, HidKeyCode::Enter),
        (0x29, HidKeyCode::Escape),
        (0x2A, HidKeyCode::Backspace),
        (0x2B, HidKeyCode::Tab),
        (0x2C, HidKeyCode::Space),
        (0x39, HidKeyCode::CapsLock),
        (0x3A, HidKeyCode::F1),
        (0x45, HidKeyCode::F12),
        (0x4F, HidKeyCode::ArrowRight),
        (0x52, HidKeyCode::ArrowUp),
        (0x53, HidKeyCode::NumLock),
        (0x62, HidKeyCode::Numpad0),
        (0x65, HidKeyCode::ContextMenu),
    ];

    #[test]
    fn test_from_u8_produces_correct_key_codes_for_standard_keys() {
        for &(raw, expected) in STANDARD_KEYS {
            // Arrange / Act
            let result = HidKeyCode::from_u8(raw);

            // Assert
            assert_eq!(
                result,
                Some(expected),
                "from_u8(0x{raw:02X}) should produce {expected:?}"
            );
        }
    }

    #[test]
    fn test_as_u8_returns_correct_hid_value_for_standard_keys() {
        for &(expected_raw, code) in STANDARD_KEYS {
            assert_eq!(
                code.as_u8(),
                expected_raw,
                "{code:?}.as_u8() should return 0x{expected_raw:02X}"
            );
        }
    }

    #[test]
    fn test_unassigned_values_return_none() {
        // 0x00 is "no key"; 0x32 and 0x64 are not part of the table; modifier
        // usages live in the modifier byte instead of the key array.
        for unassigned in [0x00, 0x01, 0x02, 0x03, 0x32, 0x64, 0x66, 0xE0, 0xFF] {
            assert_eq!(
                HidKeyCode::from_u8(unassigned),
                None,
                "0x{unassigned:02X} should not map to a key"
            );
        }
    }

    #[test]
    fn test_every_key_code_fits_descriptor_usage_range() {
        for (code, _) in KEY_NAMES {
            assert!(
                code.as_u8() <= MAX_KEY_CODE,
                "{code:?} exceeds the descriptor usage maximum"
            );
            assert!(code.as_u8() > 0, "{code:?} must not collide with the empty slot");
        }
    }

    #[test]
    fn test_all_letter_keys_covered() {
        for (i, letter) in ('a'..='z').enumerate() {
            let code = HidKeyCode::from_name(&letter.to_string()).unwrap();
            assert_eq!(code.as_u8(), 0x04 + i as u8, "letter {letter}");
        }
    }

    #[test]
    fn test_name_round_trips_through_from_name() {
        for (code, name) in KEY_NAMES {
            assert_eq!(code.name(), *name);
            assert_eq!(HidKeyCode::from_name(name), Some(*code));
        }
    }

    #[test]
    fn test_from_name_is_case_insensitive_and_accepts_aliases() {
        assert_eq!(HidKeyCode::from_name("ENTER"), Some(HidKeyCode::Enter));
        assert_eq!(HidKeyCode::from_name("Esc"), Some(HidKeyCode::Escape));
        assert_eq!(HidKeyCode::from_name("pgdn"), Some(HidKeyCode::PageDown));
    }

    #[test]
    fn test_from_name_resolves_single_symbols_through_text_table() {
        assert_eq!(HidKeyCode::from_name("!"), Some(HidKeyCode::Digit1));
        assert_eq!(HidKeyCode::from_name("/"), Some(HidKeyCode::Slash));
        assert_eq!(HidKeyCode::from_name("Q"), Some(HidKeyCode::KeyQ));
    }

    #[test]
    fn test_from_name_rejects_unknown_names() {
        assert_eq!(HidKeyCode::from_name("hyper"), None);
        assert_eq!(HidKeyCode::from_name(""), None);
        assert_eq!(HidKeyCode::from_name("é"), None);
    }
}
