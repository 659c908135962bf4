//! Domain layer: daemon configuration schema.

pub mod config;

pub use config::{load_config, ConfigError, DaemonConfig, TimingConfig};
