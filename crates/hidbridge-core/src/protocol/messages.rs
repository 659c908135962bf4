//! Command and response types exchanged over the control socket.
//!
//! All types derive `Debug`, `Clone` and `PartialEq` so tests can compare
//! decoded values directly.

use std::fmt;

use crate::keymap::hid::HidKeyCode;
use crate::keymap::modifiers::Modifiers;
use crate::report::MouseButton;

/// One request line sent to the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Type `text` (already unescaped).
    Type { text: String },
    /// Relative pointer motion; a lone non-zero `wheel` is a scroll.
    Move { dx: i32, dy: i32, wheel: i32 },
    /// Press and release one mouse button.
    Click { button: MouseButton },
    /// Press and release one named key with modifiers held.
    Key { key: HidKeyCode, modifiers: Modifiers },
    Status,
    Disconnect,
    Shutdown,
}

impl Command {
    /// Upper-case verb that starts the command line.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Type { .. } => "TYPE",
            Command::Move { .. } => "MOVE",
            Command::Click { .. } => "CLICK",
            Command::Key { .. } => "KEY",
            Command::Status => "STATUS",
            Command::Disconnect => "DISCONNECT",
            Command::Shutdown => "SHUTDOWN",
        }
    }

    /// `true` for commands that write reports to the device.
    pub fn writes_reports(&self) -> bool {
        matches!(
            self,
            Command::Type { .. } | Command::Move { .. } | Command::Click { .. } | Command::Key { .. }
        )
    }
}

/// One response line returned by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `OK` with an optional payload (JSON for `STATUS` and `TYPE`).
    Ok(Option<String>),
    /// `ERR <message>`.
    Err(String),
    /// A line carrying neither prefix, passed through verbatim.
    Raw(String),
}

impl Response {
    pub fn ok() -> Self {
        Response::Ok(None)
    }

    pub fn ok_with(payload: impl Into<String>) -> Self {
        Response::Ok(Some(payload.into()))
    }

    pub fn err(message: impl fmt::Display) -> Self {
        Response::Err(message.to_string())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok(_))
    }

    /// Payload text of an `OK` or `Raw` response.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Response::Ok(payload) => payload.as_deref(),
            Response::Raw(line) => Some(line.as_str()),
            Response::Err(_) => None,
        }
    }
}
