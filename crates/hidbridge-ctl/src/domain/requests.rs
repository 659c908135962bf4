//! Request bodies accepted from upstream callers (e.g. an HTTP front end).
//!
//! Each request deserializes from the JSON body the caller sends and
//! converts 1:1 into a protocol [`Command`]. Missing fields take the same
//! defaults the upstream API documents: empty text, zero deltas, the left
//! button.

use hidbridge_core::{Command, HidKeyCode, Modifiers, MouseButton, ProtocolError};
use serde::Deserialize;

/// `{"text": "..."}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TypeRequest {
    #[serde(default)]
    pub text: String,
}

/// `{"x": 10, "y": -5, "wheel": 1}`; `wheel` is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub wheel: Option<i32>,
}

/// `{"button": "left"}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClickRequest {
    #[serde(default = "default_button")]
    pub button: String,
}

/// `{"key": "enter", "modifiers": ["ctrl", "shift"]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KeyRequest {
    pub key: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

fn default_button() -> String {
    "left".to_string()
}

impl Default for ClickRequest {
    fn default() -> Self {
        Self {
            button: default_button(),
        }
    }
}

impl From<TypeRequest> for Command {
    fn from(req: TypeRequest) -> Self {
        Command::Type { text: req.text }
    }
}

impl From<MoveRequest> for Command {
    fn from(req: MoveRequest) -> Self {
        Command::Move {
            dx: req.x,
            dy: req.y,
            wheel: req.wheel.unwrap_or(0),
        }
    }
}

impl TryFrom<ClickRequest> for Command {
    type Error = ProtocolError;

    fn try_from(req: ClickRequest) -> Result<Self, Self::Error> {
        let button = MouseButton::from_name(&req.button)
            .ok_or(ProtocolError::UnknownButton(req.button))?;
        Ok(Command::Click { button })
    }
}

impl TryFrom<KeyRequest> for Command {
    type Error = ProtocolError;

    fn try_from(req: KeyRequest) -> Result<Self, Self::Error> {
        let key = HidKeyCode::from_name(&req.key).ok_or(ProtocolError::UnknownKey(req.key))?;
        let mut modifiers = Modifiers::NONE;
        for name in &req.modifiers {
            modifiers |= Modifiers::from_name(name)
                .ok_or_else(|| ProtocolError::UnknownModifier(name.clone()))?;
        }
        Ok(Command::Key { key, modifiers })
    }
}
