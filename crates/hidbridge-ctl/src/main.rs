//! hidctl: unprivileged command-line front end for hidbridge.
//!
//! Every invocation runs one operation through [`HidService`]. If nothing
//! listens on the control socket, `hidctl` launches `hidbridged` itself and
//! stops it again before exiting, unless `--keep-daemon` is given. A daemon
//! that was already running (systemd, an earlier `--keep-daemon`) is used
//! as is and left alone.
//!
//! # Examples
//!
//! ```text
//! hidctl type "Hello, world!"
//! hidctl move -20 15 --wheel -1
//! hidctl click right
//! hidctl key delete ctrl alt
//! hidctl status
//! hidctl adapter set --powered true --discoverable false
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable             | Flag             |
//! |----------------------|------------------|
//! | `HIDBRIDGE_SOCKET`   | `--socket`       |
//! | `HIDBRIDGE_DAEMON`   | `--daemon`       |
//! | `HIDBRIDGE_DAEMON_LOG` | `--daemon-log` |
//! | `HIDBRIDGE_ADAPTER`  | `--adapter-path` |
//! | `HIDBRIDGE_LOG_LEVEL` | `--log-level`   |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use hidbridge_core::Command as ProtocolCommand;
use hidbridge_ctl::application::HidService;
use hidbridge_ctl::domain::{ClickRequest, KeyRequest, MoveRequest, SupervisorConfig, TypeRequest};
use hidbridge_ctl::infrastructure::adapter::DEFAULT_ADAPTER_PATH;
use hidbridge_ctl::infrastructure::{BluezAdapter, DaemonSupervisor};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Drive the hidbridge USB keyboard and mouse.
#[derive(Debug, Parser)]
#[command(name = "hidctl", about = "Control the hidbridge HID daemon", version)]
struct Cli {
    /// Control socket of the daemon.
    #[arg(long, global = true, default_value = "/tmp/hidbridge.sock", env = "HIDBRIDGE_SOCKET")]
    socket: PathBuf,

    /// Daemon executable launched when nothing listens on the socket.
    #[arg(long, global = true, default_value = "hidbridged", env = "HIDBRIDGE_DAEMON")]
    daemon: PathBuf,

    /// Extra argument for a launched daemon; repeatable.
    #[arg(long = "daemon-arg", global = true, allow_hyphen_values = true)]
    daemon_args: Vec<String>,

    /// File receiving a launched daemon's output.
    #[arg(long, global = true, env = "HIDBRIDGE_DAEMON_LOG")]
    daemon_log: Option<PathBuf>,

    /// Milliseconds a launched daemon may take to open its socket.
    #[arg(long, global = true, default_value_t = 1000)]
    warmup_ms: u64,

    /// Leave a daemon launched by this invocation running.
    #[arg(long, global = true)]
    keep_daemon: bool,

    /// D-Bus object path of the Bluetooth adapter.
    #[arg(long, global = true, default_value = DEFAULT_ADAPTER_PATH, env = "HIDBRIDGE_ADAPTER")]
    adapter_path: String,

    /// Do not query the Bluetooth adapter in `status`.
    #[arg(long, global = true)]
    no_adapter: bool,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "warn", env = "HIDBRIDGE_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Type text; newlines and tabs become Enter and Tab.
    Type { text: String },
    /// Move the pointer by a relative offset.
    Move {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
        /// Scroll wheel steps.
        #[arg(long, allow_negative_numbers = true)]
        wheel: Option<i32>,
    },
    /// Click a mouse button (left, right, middle).
    Click {
        #[arg(default_value = "left")]
        button: String,
    },
    /// Press and release a named key with optional modifiers.
    Key {
        key: String,
        modifiers: Vec<String>,
    },
    /// Print daemon and adapter status as JSON.
    Status,
    /// Release everything and re-enumerate the USB gadget.
    Disconnect,
    /// Stop the daemon.
    Shutdown,
    /// Show or change the Bluetooth adapter state.
    Adapter {
        #[command(subcommand)]
        action: AdapterAction,
    },
}

#[derive(Debug, Subcommand)]
enum AdapterAction {
    /// Print `powered` and `discoverable`.
    Show,
    /// Set power and visibility.
    Set {
        #[arg(long, action = clap::ArgAction::Set)]
        powered: bool,
        #[arg(long, action = clap::ArgAction::Set)]
        discoverable: bool,
    },
}

impl Cli {
    fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            socket_path: self.socket.clone(),
            daemon_program: self.daemon.clone(),
            daemon_args: self.daemon_args.clone(),
            daemon_log: self.daemon_log.clone(),
            warmup_timeout: Duration::from_millis(self.warmup_ms),
            keep_daemon: self.keep_daemon,
            ..SupervisorConfig::default()
        }
    }

    /// Whether this action needs the Bluetooth adapter.
    fn wants_adapter(&self) -> bool {
        match self.action {
            Action::Adapter { .. } => true,
            Action::Status => !self.no_adapter,
            _ => false,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let supervisor = Arc::new(DaemonSupervisor::with_process_launcher(cli.supervisor_config()));
    let mut service = HidService::new(Arc::clone(&supervisor));
    let mut adapter_error = None;
    if cli.wants_adapter() {
        match BluezAdapter::connect(&cli.adapter_path).await {
            Ok(adapter) => service = service.with_adapter(Arc::new(adapter)),
            Err(e) => {
                warn!("Bluetooth adapter unavailable: {e}");
                adapter_error = Some(e.to_string());
            }
        }
    }

    let result = run(&service, cli.action, adapter_error).await;

    if !cli.keep_daemon {
        let outcome = service.shutdown_daemon().await;
        debug!("daemon shutdown: {outcome:?}");
    }
    result
}

async fn run(
    service: &HidService,
    action: Action,
    adapter_error: Option<String>,
) -> anyhow::Result<()> {
    match action {
        Action::Type { text } => {
            if let Some(report) = service.type_text(TypeRequest { text }).await? {
                if !report.skipped.is_empty() {
                    let skipped: String = report.skipped.iter().collect();
                    eprintln!("typed {} characters, skipped {skipped:?}", report.typed);
                }
            }
        }
        Action::Move { x, y, wheel } => service.move_pointer(MoveRequest { x, y, wheel }).await?,
        Action::Click { button } => service.click(ClickRequest { button }).await?,
        Action::Key { key, modifiers } => service.press_key(KeyRequest { key, modifiers }).await?,
        Action::Disconnect => service.disconnect().await?,
        Action::Shutdown => {
            service.supervisor().send(&ProtocolCommand::Shutdown).await?;
        }
        Action::Status => {
            let mut status = service.status().await;
            if let (Some(error), Value::Object(fields)) = (adapter_error, &mut status) {
                fields.insert("adapter_error".into(), Value::String(error));
            }
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Action::Adapter { action } => match action {
            AdapterAction::Show => {
                let status = service.status().await;
                let pick = |key: &str| status.get(key).cloned().unwrap_or(Value::Null);
                let shown = serde_json::json!({
                    "powered": pick("powered"),
                    "discoverable": pick("discoverable"),
                });
                println!("{}", serde_json::to_string_pretty(&shown)?);
            }
            AdapterAction::Set {
                powered,
                discoverable,
            } => {
                if let Some(error) = adapter_error {
                    anyhow::bail!("Bluetooth adapter unavailable: {error}");
                }
                service
                    .set_adapter_state(powered, discoverable)
                    .await
                    .context("failed to set adapter state")?;
            }
        },
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
