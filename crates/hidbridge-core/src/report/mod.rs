//! Binary HID reports written to the gadget device node.
//!
//! # Layout
//!
//! ```text
//! byte  0      modifier bitmask (see Modifiers)
//! byte  1      reserved, always 0
//! bytes 2..8   up to six key codes, zero padded
//! byte  8      mouse buttons: bit0 left, bit1 right, bit2 middle
//! byte  9      dx   (i8)
//! byte 10      dy   (i8)
//! byte 11      wheel (i8)
//! ```
//!
//! A [`CombinedReport`] is the atomic unit written to the device: a keyboard
//! write zeroes the mouse half and a mouse write zeroes the keyboard half.
//! Mouse deltas are saturated to [-127, 127] before encoding; they never wrap.

pub mod descriptor;

use serde::{Deserialize, Serialize};

use crate::keymap::hid::HidKeyCode;
use crate::keymap::modifiers::Modifiers;

pub const KEYBOARD_REPORT_LEN: usize = 8;
pub const MOUSE_REPORT_LEN: usize = 4;
/// Size of every report written to the device node.
pub const COMBINED_REPORT_LEN: usize = KEYBOARD_REPORT_LEN + MOUSE_REPORT_LEN;

/// Largest magnitude a relative axis can carry in one report.
pub const AXIS_LIMIT: i32 = 127;

// ── Mouse buttons ─────────────────────────────────────────────────────────────

/// A single mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Bit in the buttons byte of the mouse report.
    pub fn bit(self) -> u8 {
        match self {
            MouseButton::Left => 0x01,
            MouseButton::Right => 0x02,
            MouseButton::Middle => 0x04,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }

    /// Parses `left`/`right`/`middle` and the aliases `button1`/`button2`/`button3`
    /// and `mid`, case-insensitively.
    pub fn from_name(name: &str) -> Option<MouseButton> {
        match name.to_ascii_lowercase().as_str() {
            "left" | "button1" => Some(MouseButton::Left),
            "right" | "button2" => Some(MouseButton::Right),
            "middle" | "mid" | "button3" => Some(MouseButton::Middle),
            _ => None,
        }
    }
}

/// Bitmask of pressed mouse buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MouseButtons(pub u8);

impl MouseButtons {
    pub const NONE: MouseButtons = MouseButtons(0);
}

impl From<MouseButton> for MouseButtons {
    fn from(button: MouseButton) -> Self {
        MouseButtons(button.bit())
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

/// The 8-byte keyboard half.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifiers: Modifiers,
    pub keys: [u8; 6],
}

impl KeyboardReport {
    /// A report holding one key (slot 0) with `modifiers`.
    pub fn single(code: HidKeyCode, modifiers: Modifiers) -> Self {
        let mut keys = [0u8; 6];
        keys[0] = code.as_u8();
        Self { modifiers, keys }
    }

    pub fn to_bytes(&self) -> [u8; KEYBOARD_REPORT_LEN] {
        let mut out = [0u8; KEYBOARD_REPORT_LEN];
        out[0] = self.modifiers.bits();
        out[2..].copy_from_slice(&self.keys);
        out
    }
}

/// The 4-byte mouse half.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseReport {
    pub buttons: MouseButtons,
    pub dx: i8,
    pub dy: i8,
    pub wheel: i8,
}

impl MouseReport {
    /// Builds a report, saturating every axis to [-127, 127].
    pub fn new(buttons: MouseButtons, dx: i32, dy: i32, wheel: i32) -> Self {
        Self {
            buttons,
            dx: clamp_axis(dx),
            dy: clamp_axis(dy),
            wheel: clamp_axis(wheel),
        }
    }

    pub fn to_bytes(&self) -> [u8; MOUSE_REPORT_LEN] {
        [
            self.buttons.0,
            self.dx as u8,
            self.dy as u8,
            self.wheel as u8,
        ]
    }
}

/// Keyboard report followed by mouse report, 12 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CombinedReport(pub [u8; COMBINED_REPORT_LEN]);

impl CombinedReport {
    pub fn new(keyboard: KeyboardReport, mouse: MouseReport) -> Self {
        let mut out = [0u8; COMBINED_REPORT_LEN];
        out[..KEYBOARD_REPORT_LEN].copy_from_slice(&keyboard.to_bytes());
        out[KEYBOARD_REPORT_LEN..].copy_from_slice(&mouse.to_bytes());
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; COMBINED_REPORT_LEN] {
        &self.0
    }

    pub fn keyboard_bytes(&self) -> &[u8] {
        &self.0[..KEYBOARD_REPORT_LEN]
    }

    pub fn mouse_bytes(&self) -> &[u8] {
        &self.0[KEYBOARD_REPORT_LEN..]
    }

    /// `true` for the all-zero release report.
    pub fn is_release(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

// ── Encoders ──────────────────────────────────────────────────────────────────

/// Saturates `value` into the signed range a relative axis can carry.
///
/// `clamp_axis(clamp_axis(v) as i32) == clamp_axis(v)` for every `v`.
pub fn clamp_axis(value: i32) -> i8 {
    value.clamp(-AXIS_LIMIT, AXIS_LIMIT) as i8
}

/// Key-down report: keyboard half set, mouse half zero.
pub fn encode_key(code: HidKeyCode, modifiers: Modifiers) -> CombinedReport {
    CombinedReport::new(KeyboardReport::single(code, modifiers), MouseReport::default())
}

/// All-zero report releasing every key and button.
pub fn encode_key_release() -> CombinedReport {
    CombinedReport::default()
}

/// Mouse report: keyboard half zero, mouse half set with clamped axes.
pub fn encode_mouse(buttons: MouseButtons, dx: i32, dy: i32, wheel: i32) -> CombinedReport {
    CombinedReport::new(
        KeyboardReport::default(),
        MouseReport::new(buttons, dx, dy, wheel),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key_sets_keyboard_half_and_zeroes_mouse_half() {
        // Arrange / Act
        let report = encode_key(HidKeyCode::KeyA, Modifiers::SHIFT);

        // Assert
        assert_eq!(
            report.as_bytes(),
            &[0x02, 0x00, 0x04, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert!(report.mouse_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_key_release_is_all_zero() {
        let report = encode_key_release();
        assert_eq!(report.as_bytes(), &[0u8; COMBINED_REPORT_LEN]);
        assert!(report.is_release());
    }

    #[test]
    fn test_encode_mouse_clamps_out_of_range_deltas() {
        // Arrange / Act
        let report = encode_mouse(MouseButtons::NONE, 200, -300, 0);

        // Assert
        assert_eq!(report.mouse_bytes(), &[0x00, 0x7f, 0x81, 0x00]);
        assert!(report.keyboard_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_mouse_negative_deltas_are_twos_complement() {
        let report = encode_mouse(MouseButtons::NONE, -1, -5, -127);
        assert_eq!(report.mouse_bytes(), &[0x00, 0xff, 0xfb, 0x81]);
    }

    #[test]
    fn test_encode_mouse_sets_button_bits() {
        let middle = encode_mouse(MouseButtons::from(MouseButton::Middle), 0, 0, 0);
        let chord = encode_mouse(MouseButtons(0b101), 0, 0, 0);
        assert_eq!(middle.mouse_bytes()[0], 0x04);
        assert_eq!(chord.mouse_bytes()[0], 0x05);
    }

    #[test]
    fn test_clamp_axis_saturates_and_is_idempotent() {
        for v in [i32::MIN, -1000, -128, -127, -1, 0, 1, 126, 127, 128, 1000, i32::MAX] {
            let once = clamp_axis(v);
            assert_eq!(once as i32, v.clamp(-127, 127), "clamp_axis({v})");
            assert_eq!(clamp_axis(once as i32), once, "idempotent for {v}");
        }
    }

    #[test]
    fn test_mouse_button_names_and_aliases() {
        assert_eq!(MouseButton::from_name("LEFT"), Some(MouseButton::Left));
        assert_eq!(MouseButton::from_name("button2"), Some(MouseButton::Right));
        assert_eq!(MouseButton::from_name("mid"), Some(MouseButton::Middle));
        assert_eq!(MouseButton::from_name("button3"), Some(MouseButton::Middle));
        assert_eq!(MouseButton::from_name("side"), None);
        assert_eq!(MouseButton::Middle.name(), "middle");
    }

    #[test]
    fn test_combined_report_is_twelve_bytes() {
        assert_eq!(COMBINED_REPORT_LEN, 12);
        assert_eq!(std::mem::size_of::<CombinedReport>(), 12);
    }
}
