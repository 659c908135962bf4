//! Dispatches decoded control commands to the report writer and the gadget.
//!
//! Input commands (`TYPE`, `MOVE`, `CLICK`, `KEY`) and `DISCONNECT` run one
//! at a time under the writer mutex so the reports of two concurrent
//! connections never interleave. `STATUS` and `SHUTDOWN` do not touch the
//! writer and answer immediately even while a long `TYPE` is in progress.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use hidbridge_core::{decode_command, Command, Response};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::application::emit_reports::ReportWriter;
use crate::infrastructure::device_node::HidgDevice;
use crate::infrastructure::gadget::GadgetProvisioner;

/// Executes one command per call and produces its response.
pub struct CommandHandler {
    writer: Mutex<ReportWriter>,
    device: HidgDevice,
    /// `None` when provisioning is disabled (`--no-provision`, `--dry-run`).
    provisioner: Option<Arc<GadgetProvisioner>>,
    socket_path: PathBuf,
    running: Arc<AtomicBool>,
    dry_run: bool,
}

impl CommandHandler {
    pub fn new(
        writer: ReportWriter,
        device: HidgDevice,
        provisioner: Option<Arc<GadgetProvisioner>>,
        socket_path: PathBuf,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            writer: Mutex::new(writer),
            device,
            provisioner,
            socket_path,
            running,
            dry_run: false,
        }
    }

    /// Marks the handler as writing to an in-memory sink; reported by STATUS.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Decodes `line` and executes it. Protocol errors become `ERR` responses.
    pub async fn handle_line(&self, line: &str) -> Response {
        match decode_command(line) {
            Ok(command) => self.handle(command).await,
            Err(e) => {
                debug!("rejected command line: {e}");
                Response::err(e)
            }
        }
    }

    pub async fn handle(&self, command: Command) -> Response {
        debug!("handling {}", command.verb());

        if command.writes_reports() {
            if let Err(response) = self.ensure_device().await {
                return response;
            }
        }

        match command {
            Command::Type { text } => {
                let writer = self.writer.lock().await;
                match writer.send_text(&text).await {
                    Ok(outcome) => match serde_json::to_string(&outcome) {
                        Ok(payload) => Response::ok_with(payload),
                        Err(e) => Response::err(e),
                    },
                    Err(e) => Response::err(e),
                }
            }

            Command::Move { dx, dy, wheel } => {
                let writer = self.writer.lock().await;
                let result = if dx == 0 && dy == 0 && wheel != 0 {
                    writer.send_scroll(wheel).await
                } else {
                    writer.send_mouse_move(dx, dy, wheel).await
                };
                into_response(result)
            }

            Command::Click { button } => {
                let writer = self.writer.lock().await;
                into_response(writer.send_mouse_click(button).await)
            }

            Command::Key { key, modifiers } => {
                let writer = self.writer.lock().await;
                into_response(writer.send_key_event(key, modifiers).await)
            }

            Command::Status => Response::ok_with(self.status_json()),

            Command::Disconnect => self.disconnect().await,

            Command::Shutdown => {
                info!("SHUTDOWN received; stopping daemon");
                self.running.store(false, Ordering::Relaxed);
                Response::ok()
            }
        }
    }

    /// Provisions the gadget if the device node is missing.
    async fn ensure_device(&self) -> Result<(), Response> {
        let Some(provisioner) = &self.provisioner else {
            return Ok(());
        };
        if self.device.exists() {
            return Ok(());
        }
        provisioner
            .provision()
            .await
            .map(|_| ())
            .map_err(Response::err)
    }

    async fn disconnect(&self) -> Response {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.release_all().await {
            return Response::err(e);
        }
        match &self.provisioner {
            Some(provisioner) => match provisioner.soft_reconnect().await {
                Ok(()) => Response::ok(),
                Err(e) => {
                    warn!("soft reconnect failed: {e}");
                    Response::err(e)
                }
            },
            None => Response::ok(),
        }
    }

    fn status_json(&self) -> String {
        let gadget = self.provisioner.as_ref().map(|p| p.state());
        let udc_state = self.provisioner.as_ref().and_then(|p| p.udc_state());
        let connected = udc_state.as_deref() == Some("configured");
        json!({
            "device": self.device.path().display().to_string(),
            "device_exists": self.device.exists(),
            "device_writable": self.device.is_writable(),
            "gadget": gadget,
            "udc_state": udc_state,
            "connected": connected,
            "socket": self.socket_path.display().to_string(),
            "dry_run": self.dry_run,
        })
        .to_string()
    }
}

fn into_response<E: std::fmt::Display>(result: Result<(), E>) -> Response {
    match result {
        Ok(()) => Response::ok(),
        Err(e) => Response::err(e),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
