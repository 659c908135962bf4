//! Supervisor configuration.
//!
//! Built from the `hidctl` command line (see `main.rs`); every field has a
//! default matching the daemon's own defaults so `SupervisorConfig::default()`
//! talks to a daemon started without flags.

use std::path::PathBuf;
use std::time::Duration;

/// How the supervisor launches and reaches the daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    /// Control socket the daemon listens on.
    pub socket_path: PathBuf,
    /// Daemon executable.
    pub daemon_program: PathBuf,
    /// Extra arguments passed to the daemon after `--socket <path>`.
    pub daemon_args: Vec<String>,
    /// Log file for the daemon's stdout/stderr; discarded when `None`.
    pub daemon_log: Option<PathBuf>,
    /// How long a freshly launched daemon may take to accept connections.
    pub warmup_timeout: Duration,
    /// Interval between connection attempts during warm-up.
    pub warmup_poll: Duration,
    /// How long `shutdown()` waits after `SHUTDOWN` before killing.
    pub shutdown_timeout: Duration,
    /// Leave the daemon running when the supervisor is dropped.
    pub keep_daemon: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/hidbridge.sock"),
            daemon_program: PathBuf::from("hidbridged"),
            daemon_args: Vec::new(),
            daemon_log: None,
            warmup_timeout: Duration::from_secs(1),
            warmup_poll: Duration::from_millis(50),
            shutdown_timeout: Duration::from_secs(2),
            keep_daemon: false,
        }
    }
}
