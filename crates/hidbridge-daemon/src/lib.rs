//! hidbridge-daemon library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the daemon do? (for beginners)
//!
//! The daemon is the only process that touches the USB HID gadget. It runs
//! with enough privilege to load kernel modules and write to configfs, and
//! it listens on a local Unix socket for one-line commands:
//!
//! ```text
//! TYPE hello\n          -> OK {"typed":5,"skipped":[]}
//! MOVE 10 -5\n          -> OK
//! CLICK left\n          -> OK
//! STATUS\n              -> OK {"device_exists":true,...}
//! FOO\n                 -> ERR unknown command
//! ```
//!
//! Each input command becomes a short sequence of 12-byte reports written to
//! `/dev/hidg0`, which the host computer on the other end of the USB cable
//! sees as a keyboard and mouse.

/// Domain layer: configuration schema.
pub mod domain;

/// Application layer: report writer and command dispatch.
pub mod application;

/// Infrastructure layer: device node, gadget provisioning, socket server.
pub mod infrastructure;
