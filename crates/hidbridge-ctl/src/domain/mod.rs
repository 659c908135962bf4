//! Domain layer: supervisor configuration and upstream request types.

pub mod config;
pub mod requests;

pub use config::SupervisorConfig;
pub use requests::{ClickRequest, KeyRequest, MoveRequest, TypeRequest};
