//! hidbridged: the privileged hidbridge daemon.
//!
//! Owns the USB HID gadget and serves one-line commands on a Unix socket.
//!
//! # Usage
//!
//! ```text
//! hidbridged [OPTIONS]
//!
//! Options:
//!   --config <PATH>    TOML config file [default: /etc/hidbridge/daemon.toml]
//!   --socket <PATH>    Control socket path (overrides [socket].path)
//!   --device <PATH>    HID device node (overrides [device].path)
//!   --no-provision     Never touch configfs; expect the node to exist
//!   --dry-run          Log reports instead of writing the device
//!   --log-level <LVL>  Log level when RUST_LOG is unset
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable               | Flag             |
//! |------------------------|------------------|
//! | `HIDBRIDGE_CONFIG`     | `--config`       |
//! | `HIDBRIDGE_SOCKET`     | `--socket`       |
//! | `HIDBRIDGE_DEVICE`     | `--device`       |
//! | `HIDBRIDGE_NO_PROVISION` | `--no-provision` |
//! | `HIDBRIDGE_DRY_RUN`    | `--dry-run`      |
//! | `HIDBRIDGE_LOG_LEVEL`  | `--log-level`    |
//!
//! # What happens at startup
//!
//! 1. The config file is loaded (defaults when it does not exist) and the
//!    CLI overrides are applied.
//! 2. Logging is initialised; `RUST_LOG` wins over the configured level.
//! 3. If provisioning is enabled and the device node is missing, the gadget
//!    is built. A failure is logged and retried on the first input command.
//! 4. SIGINT / SIGTERM handlers clear the shared `running` flag.
//! 5. [`run_server`] serves the control socket until the flag is cleared,
//!    either by a signal or by a `SHUTDOWN` command.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hidbridge_daemon::application::emit_reports::{ReportSink, ReportWriter, WriterTiming};
use hidbridge_daemon::application::handle_command::CommandHandler;
use hidbridge_daemon::domain::config::{load_config, DaemonConfig};
use hidbridge_daemon::infrastructure::device_node::HidgDevice;
use hidbridge_daemon::infrastructure::gadget::{GadgetProvisioner, SystemCommandRunner};
use hidbridge_daemon::infrastructure::logging_sink::LoggingSink;
use hidbridge_daemon::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Privileged USB HID keyboard + mouse daemon.
#[derive(Debug, Parser)]
#[command(name = "hidbridged", about = "USB HID gadget daemon for hidbridge", version)]
struct Cli {
    /// Path of the TOML configuration file. A missing file means defaults.
    #[arg(long, default_value = "/etc/hidbridge/daemon.toml", env = "HIDBRIDGE_CONFIG")]
    config: PathBuf,

    /// Control socket path.
    #[arg(long, env = "HIDBRIDGE_SOCKET")]
    socket: Option<PathBuf>,

    /// HID gadget device node.
    #[arg(long, env = "HIDBRIDGE_DEVICE")]
    device: Option<PathBuf>,

    /// Do not create or bind the USB gadget.
    #[arg(long, env = "HIDBRIDGE_NO_PROVISION")]
    no_provision: bool,

    /// Log reports instead of writing them; implies --no-provision.
    #[arg(long, env = "HIDBRIDGE_DRY_RUN")]
    dry_run: bool,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "HIDBRIDGE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    fn into_daemon_config(self) -> anyhow::Result<(DaemonConfig, bool)> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("failed to load config {}", self.config.display()))?;

        if let Some(socket) = self.socket {
            config.socket.path = socket;
        }
        if let Some(device) = self.device {
            config.device.path = device;
        }
        if let Some(level) = self.log_level {
            config.daemon.log_level = level;
        }
        if self.no_provision || self.dry_run {
            config.daemon.provision = false;
        }
        Ok((config, self.dry_run))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, dry_run) = cli.into_daemon_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.daemon.log_level)),
        )
        .init();

    info!(
        "hidbridged starting: socket={}, device={}, provision={}, dry_run={dry_run}",
        config.socket.path.display(),
        config.device.path.display(),
        config.daemon.provision
    );

    // ── Gadget ────────────────────────────────────────────────────────────────
    let provisioner = config.daemon.provision.then(|| {
        Arc::new(GadgetProvisioner::new(
            config.gadget.clone(),
            config.device.clone(),
            Arc::new(SystemCommandRunner),
        ))
    });
    if let Some(provisioner) = &provisioner {
        if let Err(e) = provisioner.provision().await {
            // Input commands retry provisioning; STATUS stays available.
            warn!("initial provisioning failed: {e}");
        }
    }

    // ── Report writer ─────────────────────────────────────────────────────────
    let device = HidgDevice::new(config.device.path.clone());
    let sink: Arc<dyn ReportSink> = if dry_run {
        Arc::new(LoggingSink::new())
    } else {
        Arc::new(device.clone())
    };
    let writer = ReportWriter::new(sink, WriterTiming::from(&config.timing));

    // ── Shutdown flag ─────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    spawn_signal_handler(Arc::clone(&running))?;

    let handler = Arc::new(
        CommandHandler::new(
            writer,
            device,
            provisioner,
            config.socket.path.clone(),
            Arc::clone(&running),
        )
        .dry_run(dry_run),
    );

    run_server(&config.socket, handler, running).await?;

    info!("hidbridged stopped");
    Ok(())
}

/// Clears `running` on SIGINT or SIGTERM.
fn spawn_signal_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM; initiating graceful shutdown"),
            _ = sigint.recv() => info!("received SIGINT; initiating graceful shutdown"),
        }
        running.store(false, Ordering::Relaxed);
    });
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
