//! # hidbridge-core
//!
//! Shared library for hidbridge containing the HID report codec, the key
//! tables, the fixed report descriptor and the line-oriented command protocol.
//!
//! This crate is used by both the privileged daemon and the unprivileged
//! control client. It has zero dependencies on OS APIs, device nodes, or
//! sockets: every function here is a pure transformation.
//!
//! # Architecture overview
//!
//! hidbridge turns a single-board computer into a USB keyboard + mouse. A
//! privileged daemon owns the HID gadget device node and accepts textual
//! commands on a local socket; unprivileged callers send it commands such as
//! `TYPE hello` or `MOVE 10 -5`.
//!
//! - **`keymap`** – USB HID Usage IDs, the modifier bitmask, and the table
//!   that turns typed characters into keystrokes.
//!
//! - **`report`** – The fixed-size binary reports written to the device node
//!   (8-byte keyboard + 4-byte mouse = 12-byte combined report) and the report
//!   descriptor the host uses to interpret them.
//!
//! - **`protocol`** – The command grammar exchanged over the control socket
//!   (`TYPE`, `MOVE`, `CLICK`, `KEY`, `STATUS`, `DISCONNECT`, `SHUTDOWN`),
//!   its escaping rules, and the `OK`/`ERR` response framing.

pub mod keymap;
pub mod protocol;
pub mod report;

// Re-export the most-used types at the crate root so callers can write
// `hidbridge_core::CombinedReport` instead of the full module path.
pub use keymap::hid::HidKeyCode;
pub use keymap::modifiers::Modifiers;
pub use keymap::{plan_text, text_to_events, KeyStroke, TextPlan};
pub use protocol::codec::{decode_command, decode_response, encode_command, encode_response, ProtocolError};
pub use protocol::messages::{Command, Response};
pub use report::descriptor::COMBINED_REPORT_DESCRIPTOR;
pub use report::{
    clamp_axis, encode_key, encode_key_release, encode_mouse, CombinedReport, KeyboardReport,
    MouseButton, MouseButtons, MouseReport, COMBINED_REPORT_LEN,
};
