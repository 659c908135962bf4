//! Line codec for the control socket protocol.
//!
//! Wire format (one request and one response per connection):
//! ```text
//! request  := VERB [SP args] LF
//! response := "OK" [SP payload] LF | "ERR" SP message LF
//! ```
//!
//! Verbs are case-insensitive and a trailing CR is stripped, so a line typed
//! into `socat` or `nc` on a CRLF terminal decodes the same way. The
//! [`Display`](std::fmt::Display) text of every [`ProtocolError`] is exactly
//! the message the daemon sends back after `ERR `.

use thiserror::Error;

use crate::keymap::hid::HidKeyCode;
use crate::keymap::modifiers::Modifiers;
use crate::protocol::escape::{escape, unescape};
use crate::protocol::messages::{Command, Response};
use crate::report::MouseButton;

/// Longest request line the daemon accepts, in bytes.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Errors produced while decoding a request line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line was empty or whitespace only.
    #[error("missing command")]
    MissingCommand,

    /// The verb is not one of the known commands.
    #[error("unknown command")]
    UnknownCommand(String),

    #[error("missing text")]
    MissingText,

    /// `MOVE` without two parseable integers.
    #[error("MOVE requires X and Y")]
    MoveArguments,

    #[error("CLICK requires button")]
    MissingButton,

    #[error("unknown button")]
    UnknownButton(String),

    #[error("KEY requires key")]
    MissingKey,

    #[error("unknown key")]
    UnknownKey(String),

    #[error("unknown modifier")]
    UnknownModifier(String),

    #[error("command line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// The request bytes were not valid UTF-8.
    #[error("invalid utf-8")]
    InvalidUtf8,
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// Encodes `command` as a newline-terminated request line.
///
/// # Examples
///
/// ```rust
/// use hidbridge_core::protocol::codec::{decode_command, encode_command};
/// use hidbridge_core::protocol::messages::Command;
///
/// let cmd = Command::Type { text: "Hi!\n".into() };
/// let line = encode_command(&cmd);
/// assert_eq!(line, "TYPE Hi!\\n\n");
/// assert_eq!(decode_command(&line).unwrap(), cmd);
/// ```
pub fn encode_command(command: &Command) -> String {
    let mut line = match command {
        Command::Type { text } => format!("TYPE {}", escape(text)),
        Command::Move { dx, dy, wheel } if *wheel == 0 => format!("MOVE {dx} {dy}"),
        Command::Move { dx, dy, wheel } => format!("MOVE {dx} {dy} {wheel}"),
        Command::Click { button } => format!("CLICK {}", button.name()),
        Command::Key { key, modifiers } => {
            let mut line = format!("KEY {}", key.name());
            for name in modifiers.names() {
                line.push(' ');
                line.push_str(name);
            }
            line
        }
        Command::Status | Command::Disconnect | Command::Shutdown => command.verb().to_string(),
    };
    line.push('\n');
    line
}

/// Decodes one request line (with or without its trailing newline).
///
/// # Errors
///
/// Returns the [`ProtocolError`] whose message the daemon should send back.
pub fn decode_command(line: &str) -> Result<Command, ProtocolError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    // The limit counts the command itself, not its terminator.
    if line.len() > MAX_LINE_LEN {
        return Err(ProtocolError::LineTooLong { limit: MAX_LINE_LEN });
    }
    let line = line.trim_start();

    let (verb, rest) = match line.find(char::is_whitespace) {
        Some(idx) => line.split_at(idx),
        None => (line, ""),
    };
    if verb.is_empty() {
        return Err(ProtocolError::MissingCommand);
    }

    match verb.to_ascii_uppercase().as_str() {
        "TYPE" => decode_type(rest),
        "MOVE" => decode_move(rest),
        "CLICK" => decode_click(rest),
        "KEY" => decode_key(rest),
        "STATUS" => Ok(Command::Status),
        "DISCONNECT" => Ok(Command::Disconnect),
        "SHUTDOWN" => Ok(Command::Shutdown),
        _ => Err(ProtocolError::UnknownCommand(verb.to_string())),
    }
}

fn decode_type(rest: &str) -> Result<Command, ProtocolError> {
    // Only the single separator space is consumed; further whitespace is text.
    let raw = rest.strip_prefix(' ').unwrap_or(rest);
    if raw.is_empty() {
        return Err(ProtocolError::MissingText);
    }
    Ok(Command::Type { text: unescape(raw) })
}

fn decode_move(rest: &str) -> Result<Command, ProtocolError> {
    let mut args = rest.split_whitespace();
    let dx = args.next().and_then(|s| s.parse::<i32>().ok());
    let dy = args.next().and_then(|s| s.parse::<i32>().ok());
    let (Some(dx), Some(dy)) = (dx, dy) else {
        return Err(ProtocolError::MoveArguments);
    };
    // An unparseable wheel argument counts as no scroll.
    let wheel = args.next().and_then(|s| s.parse::<i32>().ok()).unwrap_or(0);
    Ok(Command::Move { dx, dy, wheel })
}

fn decode_click(rest: &str) -> Result<Command, ProtocolError> {
    let name = rest.split_whitespace().next().ok_or(ProtocolError::MissingButton)?;
    let button = MouseButton::from_name(name)
        .ok_or_else(|| ProtocolError::UnknownButton(name.to_string()))?;
    Ok(Command::Click { button })
}

fn decode_key(rest: &str) -> Result<Command, ProtocolError> {
    let mut args = rest.split_whitespace();
    let name = args.next().ok_or(ProtocolError::MissingKey)?;
    let key = HidKeyCode::from_name(name).ok_or_else(|| ProtocolError::UnknownKey(name.to_string()))?;

    let mut modifiers = Modifiers::NONE;
    for arg in args {
        // Accept both `ctrl shift` and `ctrl+shift`.
        for part in arg.split('+').filter(|p| !p.is_empty()) {
            modifiers |= Modifiers::from_name(part)
                .ok_or_else(|| ProtocolError::UnknownModifier(part.to_string()))?;
        }
    }
    Ok(Command::Key { key, modifiers })
}

// ── Responses ─────────────────────────────────────────────────────────────────

/// Encodes `response` as a newline-terminated response line.
///
/// Newlines inside a payload or message are replaced by spaces so the frame
/// stays one line.
pub fn encode_response(response: &Response) -> String {
    let single_line = |s: &str| s.replace(['\r', '\n'], " ");
    match response {
        Response::Ok(None) => "OK\n".to_string(),
        Response::Ok(Some(payload)) => format!("OK {}\n", single_line(payload)),
        Response::Err(message) => format!("ERR {}\n", single_line(message)),
        Response::Raw(line) => format!("{}\n", single_line(line)),
    }
}

/// Decodes one response line. Never fails: lines without an `OK`/`ERR`
/// prefix come back as [`Response::Raw`].
pub fn decode_response(line: &str) -> Response {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line == "OK" {
        return Response::Ok(None);
    }
    if let Some(payload) = line.strip_prefix("OK ") {
        return if payload.is_empty() {
            Response::Ok(None)
        } else {
            Response::Ok(Some(payload.to_string()))
        };
    }
    if line == "ERR" {
        return Response::Err(String::new());
    }
    if let Some(message) = line.strip_prefix("ERR ") {
        return Response::Err(message.to_string());
    }
    Response::Raw(line.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
