//! Key tables and text-to-keystroke planning.
//!
//! The canonical representation is USB HID Usage IDs (page 0x07, Keyboard/Keypad).
//! Typed text is translated character by character into [`KeyStroke`]s, each a
//! key code plus the modifiers that must be held while it is pressed. Shifted
//! symbols such as `!` or `{` carry [`Modifiers::SHIFT`] and the code of the
//! unshifted key they share a keycap with.
//!
//! Only a US-layout ASCII subset is encodable. Characters outside the table are
//! skipped rather than rejected so a single emoji in a long string does not
//! fail the whole `TYPE` command.

pub mod hid;
pub mod modifiers;

use serde::Serialize;
use tracing::debug;

pub use hid::HidKeyCode;
pub use modifiers::Modifiers;

/// One key press: a key code and the modifiers held during it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct KeyStroke {
    pub code: HidKeyCode,
    pub modifiers: Modifiers,
}

impl KeyStroke {
    pub const fn new(code: HidKeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    const fn plain(code: HidKeyCode) -> Self {
        Self::new(code, Modifiers::NONE)
    }

    const fn shifted(code: HidKeyCode) -> Self {
        Self::new(code, Modifiers::SHIFT)
    }
}

/// The keystrokes for a piece of text plus every character that had no mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextPlan {
    pub strokes: Vec<KeyStroke>,
    pub skipped: Vec<char>,
}

/// Maps a single character to the keystroke that types it on a US layout.
///
/// Returns `None` for characters outside the table.
pub fn char_to_stroke(ch: char) -> Option<KeyStroke> {
    use HidKeyCode::*;

    if ch.is_ascii_lowercase() {
        return HidKeyCode::from_u8(0x04 + (ch as u8 - b'a')).map(KeyStroke::plain);
    }
    if ch.is_ascii_uppercase() {
        return HidKeyCode::from_u8(0x04 + (ch as u8 - b'A')).map(KeyStroke::shifted);
    }
    if ('1'..='9').contains(&ch) {
        return HidKeyCode::from_u8(0x1E + (ch as u8 - b'1')).map(KeyStroke::plain);
    }

    let stroke = match ch {
        '0' => KeyStroke::plain(Digit0),
        '!' => KeyStroke::shifted(Digit1),
        '@' => KeyStroke::shifted(Digit2),
        '#' => KeyStroke::shifted(Digit3),
        '$' => KeyStroke::shifted(Digit4),
        '%' => KeyStroke::shifted(Digit5),
        '^' => KeyStroke::shifted(Digit6),
        '&' => KeyStroke::shifted(Digit7),
        '*' => KeyStroke::shifted(Digit8),
        '(' => KeyStroke::shifted(Digit9),
        ')' => KeyStroke::shifted(Digit0),

        '\n' | '\r' => KeyStroke::plain(Enter),
        '\t' => KeyStroke::plain(Tab),
        '\u{8}' => KeyStroke::plain(Backspace),
        '\u{1b}' => KeyStroke::plain(Escape),
        ' ' => KeyStroke::plain(Space),

        '-' => KeyStroke::plain(Minus),
        '_' => KeyStroke::shifted(Minus),
        '=' => KeyStroke::plain(Equal),
        '+' => KeyStroke::shifted(Equal),
        '[' => KeyStroke::plain(BracketLeft),
        '{' => KeyStroke::shifted(BracketLeft),
        ']' => KeyStroke::plain(BracketRight),
        '}' => KeyStroke::shifted(BracketRight),
        '\\' => KeyStroke::plain(Backslash),
        '|' => KeyStroke::shifted(Backslash),
        ';' => KeyStroke::plain(Semicolon),
        ':' => KeyStroke::shifted(Semicolon),
        '\'' => KeyStroke::plain(Quote),
        '"' => KeyStroke::shifted(Quote),
        '`' => KeyStroke::plain(Backquote),
        '~' => KeyStroke::shifted(Backquote),
        ',' => KeyStroke::plain(Comma),
        '<' => KeyStroke::shifted(Comma),
        '.' => KeyStroke::plain(Period),
        '>' => KeyStroke::shifted(Period),
        '/' => KeyStroke::plain(Slash),
        '?' => KeyStroke::shifted(Slash),

        _ => return None,
    };
    Some(stroke)
}

/// Plans the keystrokes for `text`, recording every character that was skipped.
pub fn plan_text(text: &str) -> TextPlan {
    let mut plan = TextPlan::default();
    for ch in text.chars() {
        match char_to_stroke(ch) {
            Some(stroke) => plan.strokes.push(stroke),
            None => {
                debug!(character = ?ch, "no key mapping, skipping");
                plan.skipped.push(ch);
            }
        }
    }
    plan
}

/// Keystrokes for `text`, silently dropping unmapped characters.
pub fn text_to_events(text: &str) -> Vec<KeyStroke> {
    plan_text(text).strokes
}

// ── Tests ─────────────────────────────────────────────────────────────────────
