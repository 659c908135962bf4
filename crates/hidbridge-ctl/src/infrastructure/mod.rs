//! Infrastructure layer for the control client.
//!
//! - **`supervisor`** – Launches, health-checks and stops the daemon process.
//! - **`socket_client`** – One-shot request/response over the control socket.
//! - **`adapter`** – Bluetooth adapter power/visibility over the system D-Bus.

pub mod adapter;
pub mod socket_client;
pub mod supervisor;

pub use adapter::{AdapterError, AdapterProperties, BluezAdapter};
pub use socket_client::CommandError;
pub use supervisor::{
    DaemonLauncher, DaemonProcess, DaemonState, DaemonSupervisor, ProcessLauncher,
    ShutdownOutcome, SupervisionError,
};
