//! Application layer use cases for the daemon.
//!
//! - **`emit_reports`** – The report writer: turns keystrokes, clicks and
//!   pointer motion into timed sequences of 12-byte reports written to a
//!   [`ReportSink`](emit_reports::ReportSink).
//!
//! - **`handle_command`** – Executes one decoded control command and builds
//!   its `OK`/`ERR` response. Owns the writer mutex that serializes input.

pub mod emit_reports;
pub mod handle_command;

pub use emit_reports::{DeviceIoError, ReportSink, ReportWriter, TypeOutcome, WriterTiming};
pub use handle_command::CommandHandler;
