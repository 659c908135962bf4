//! Control socket protocol: command/response types, the line codec and the
//! escaping rules for `TYPE` text.

pub mod codec;
pub mod escape;
pub mod messages;

pub use codec::{
    decode_command, decode_response, encode_command, encode_response, ProtocolError, MAX_LINE_LEN,
};
pub use escape::{escape, unescape};
pub use messages::{Command, Response};
