//! Keyboard modifier bitmask carried in byte 0 of a keyboard report.
//!
//! Only the left-hand modifiers are used; the combined report never needs to
//! distinguish left from right.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Modifier keys held while a key code is pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0x00);
    pub const CTRL: Modifiers = Modifiers(0x01);
    pub const SHIFT: Modifiers = Modifiers(0x02);
    pub const ALT: Modifiers = Modifiers(0x04);
    pub const GUI: Modifiers = Modifiers(0x08);

    /// Returns the raw modifier byte.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses a single modifier name.
    ///
    /// Accepts `ctrl`/`control`, `shift`, `alt`/`option`, and
    /// `gui`/`meta`/`super`/`win`/`cmd`, case-insensitively.
    pub fn from_name(name: &str) -> Option<Modifiers> {
        match name.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Some(Self::CTRL),
            "shift" => Some(Self::SHIFT),
            "alt" | "option" => Some(Self::ALT),
            "gui" | "meta" | "super" | "win" | "cmd" => Some(Self::GUI),
            _ => None,
        }
    }

    /// Lowercase names of the set bits, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        [
            (Self::CTRL, "ctrl"),
            (Self::SHIFT, "shift"),
            (Self::ALT, "alt"),
            (Self::GUI, "gui"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect()
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        self.0 |= rhs.0;
    }
}
