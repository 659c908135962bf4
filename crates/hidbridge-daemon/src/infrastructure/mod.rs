//! Infrastructure layer for the daemon.
//!
//! Contains the OS-facing adapters: the HID device node, the configfs gadget
//! provisioner, and the Unix socket command server.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `hidbridge_core`. The application layer only reaches into it for the
//! concrete device and provisioner types it reports on in STATUS.
//!
//! # Sub-modules
//!
//! - **`device_node`** – `HidgDevice`, the [`ReportSink`] over `/dev/hidg0`.
//! - **`gadget`** – Builds the USB HID gadget under configfs and binds it.
//! - **`command_server`** – Accept loop on the control socket.
//! - **`logging_sink`** – Sink for `--dry-run` that only logs reports.
//! - **`recording_sink`** – In-memory sink for tests.
//!
//! [`ReportSink`]: crate::application::emit_reports::ReportSink

pub mod command_server;
pub mod device_node;
pub mod gadget;
pub mod logging_sink;
pub mod recording_sink;

pub use command_server::run_server;
