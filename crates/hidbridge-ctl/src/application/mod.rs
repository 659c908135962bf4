//! Application layer: the operations upstream callers invoke.
//!
//! - **`hid_service`** – Typing, pointer, click, key, disconnect and merged
//!   status on top of the daemon supervisor and the Bluetooth adapter.

pub mod hid_service;

pub use hid_service::{HidService, TypeReport};
