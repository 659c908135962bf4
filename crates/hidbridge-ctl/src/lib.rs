//! hidbridge control client library.
//!
//! Shared by the `hidctl` binary and the integration tests in `tests/`.

pub mod application;
pub mod domain;
pub mod infrastructure;
