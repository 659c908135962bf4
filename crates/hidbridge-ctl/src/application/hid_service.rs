//! Caller-facing HID operations.
//!
//! [`HidService`] is what an upstream front end talks to. Every input
//! operation goes through the [`DaemonSupervisor`], so the daemon is started
//! on first use. [`HidService::status`] never fails: daemon and adapter
//! problems are folded into the returned JSON object.

use std::sync::Arc;

use hidbridge_core::{Command, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::domain::requests::{ClickRequest, KeyRequest, MoveRequest, TypeRequest};
use crate::infrastructure::adapter::{AdapterError, AdapterProperties};
use crate::infrastructure::socket_client::CommandError;
use crate::infrastructure::supervisor::{DaemonSupervisor, ShutdownOutcome};

/// Result of a `TYPE` command as reported by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeReport {
    pub typed: usize,
    #[serde(default)]
    pub skipped: Vec<char>,
}

pub struct HidService {
    supervisor: Arc<DaemonSupervisor>,
    adapter: Option<Arc<dyn AdapterProperties>>,
}

impl HidService {
    pub fn new(supervisor: Arc<DaemonSupervisor>) -> Self {
        Self {
            supervisor,
            adapter: None,
        }
    }

    /// Attaches a Bluetooth adapter whose state is reported by `status`.
    pub fn with_adapter(mut self, adapter: Arc<dyn AdapterProperties>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn supervisor(&self) -> &Arc<DaemonSupervisor> {
        &self.supervisor
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    /// Types `request.text`.
    ///
    /// Returns `None` when the daemon acknowledged without a typing report.
    pub async fn type_text(&self, request: TypeRequest) -> Result<Option<TypeReport>, CommandError> {
        let response = self.supervisor.send(&Command::from(request)).await?;
        let report = response
            .payload()
            .and_then(|payload| serde_json::from_str::<TypeReport>(payload).ok());
        if let Some(report) = &report {
            if !report.skipped.is_empty() {
                debug!("daemon skipped unmappable characters: {:?}", report.skipped);
            }
        }
        Ok(report)
    }

    pub async fn move_pointer(&self, request: MoveRequest) -> Result<(), CommandError> {
        self.supervisor.send(&Command::from(request)).await.map(drop)
    }

    pub async fn click(&self, request: ClickRequest) -> Result<(), CommandError> {
        let command = Command::try_from(request)?;
        self.supervisor.send(&command).await.map(drop)
    }

    pub async fn press_key(&self, request: KeyRequest) -> Result<(), CommandError> {
        let command = Command::try_from(request)?;
        self.supervisor.send(&command).await.map(drop)
    }

    /// Releases all keys and buttons and re-enumerates the gadget.
    pub async fn disconnect(&self) -> Result<(), CommandError> {
        self.supervisor.send(&Command::Disconnect).await.map(drop)
    }

    // ── Status ────────────────────────────────────────────────────────────────

    /// Daemon status merged with the adapter state.
    ///
    /// Keys from the daemon's `STATUS` payload come first. An unreachable
    /// daemon shows up as `"error"`, a non-JSON payload as `"raw"`. With an
    /// adapter attached, `"powered"` and `"discoverable"` are added, or
    /// `"adapter_error"` if the properties could not be read.
    pub async fn status(&self) -> Value {
        let mut status = match self.supervisor.send(&Command::Status).await {
            Ok(response) => status_fields(&response),
            Err(e) => {
                warn!("status query failed: {e}");
                let mut fields = Map::new();
                fields.insert("error".into(), Value::String(e.to_string()));
                fields
            }
        };

        if let Some(adapter) = &self.adapter {
            match read_adapter(adapter.as_ref()).await {
                Ok((powered, discoverable)) => {
                    status.insert("powered".into(), Value::Bool(powered));
                    status.insert("discoverable".into(), Value::Bool(discoverable));
                }
                Err(e) => {
                    status.insert("adapter_error".into(), Value::String(e.to_string()));
                }
            }
        }

        status.insert("daemon_state".into(), json!(self.supervisor.state()));
        Value::Object(status)
    }

    // ── Adapter ───────────────────────────────────────────────────────────────

    /// Sets adapter power and visibility.
    ///
    /// # Errors
    ///
    /// [`AdapterError::Unavailable`] if no adapter is attached.
    pub async fn set_adapter_state(
        &self,
        powered: bool,
        discoverable: bool,
    ) -> Result<(), AdapterError> {
        let adapter = self.adapter.as_ref().ok_or(AdapterError::Unavailable)?;
        adapter.set_state(powered, discoverable).await
    }

    // ── Life cycle ────────────────────────────────────────────────────────────

    /// Stops the daemon this process started.
    pub async fn shutdown_daemon(&self) -> ShutdownOutcome {
        self.supervisor.shutdown().await
    }
}

/// Turns a `STATUS` response into the base of the merged status object.
fn status_fields(response: &Response) -> Map<String, Value> {
    let Some(payload) = response.payload().filter(|p| !p.trim().is_empty()) else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(fields)) => fields,
        _ => {
            let mut fields = Map::new();
            fields.insert("raw".into(), Value::String(payload.to_string()));
            fields
        }
    }
}

async fn read_adapter(adapter: &dyn AdapterProperties) -> Result<(bool, bool), AdapterError> {
    Ok((adapter.powered().await?, adapter.discoverable().await?))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::SupervisorConfig;
    use crate::infrastructure::adapter::MockAdapterProperties;
    use crate::infrastructure::supervisor::{DaemonLauncher, DaemonProcess};
    use std::io;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixListener;
    use tokio::sync::mpsc;

    /// Refuses to start anything; tests rely on adopting a canned daemon.
    struct NoLauncher;

    impl DaemonLauncher for NoLauncher {
        fn launch(&self, _config: &SupervisorConfig) -> io::Result<Box<dyn DaemonProcess>> {
            Err(io::Error::new(io::ErrorKind::NotFound, "no daemon binary in tests"))
        }
    }

    fn temp_socket() -> PathBuf {
        std::env::temp_dir().join(format!("hidctl-service-{}.sock", uuid::Uuid::new_v4()))
    }

    /// Answers every request line with `reply` and forwards the line.
    fn canned_daemon(path: &Path, reply: &'static str) -> mpsc::UnboundedReceiver<String> {
        let listener = UnixListener::bind(path).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let (read_half, mut write_half) = stream.into_split();
                    let mut line = String::new();
                    if BufReader::new(read_half).read_line(&mut line).await.unwrap_or(0) == 0 {
                        return;
                    }
                    let _ = tx.send(line);
                    let _ = write_half.write_all(reply.as_bytes()).await;
                });
            }
        });
        rx
    }

    fn service_for(path: &Path) -> HidService {
        let config = SupervisorConfig {
            socket_path: path.to_path_buf(),
            warmup_timeout: Duration::from_millis(200),
            ..SupervisorConfig::default()
        };
        HidService::new(Arc::new(DaemonSupervisor::new(config, Arc::new(NoLauncher))))
    }

    #[tokio::test]
    async fn test_type_text_parses_report() {
        // Arrange
        let path = temp_socket();
        let mut requests = canned_daemon(&path, "OK {\"typed\":2,\"skipped\":[\"€\"]}\n");
        let service = service_for(&path);

        // Act
        let report = service
            .type_text(TypeRequest { text: "a€b".into() })
            .await
            .unwrap();

        // Assert
        assert_eq!(requests.recv().await.unwrap(), "TYPE a€b\n");
        assert_eq!(
            report,
            Some(TypeReport {
                typed: 2,
                skipped: vec!['€'],
            })
        );
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_plain_ok_to_type_has_no_report() {
        let path = temp_socket();
        let _requests = canned_daemon(&path, "OK\n");
        let service = service_for(&path);

        let report = service.type_text(TypeRequest::default()).await.unwrap();

        assert_eq!(report, None);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_move_pointer_sends_wheel() {
        let path = temp_socket();
        let mut requests = canned_daemon(&path, "OK\n");
        let service = service_for(&path);

        service
            .move_pointer(MoveRequest {
                x: 10,
                y: -5,
                wheel: Some(1),
            })
            .await
            .unwrap();

        assert_eq!(requests.recv().await.unwrap(), "MOVE 10 -5 1\n");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_unknown_button_fails_before_contacting_daemon() {
        // Arrange
        let path = temp_socket();
        let service = service_for(&path);

        // Act
        let result = service
            .click(ClickRequest {
                button: "side".into(),
            })
            .await;

        // Assert
        assert!(matches!(result, Err(CommandError::Request(_))));
        assert_eq!(service.supervisor().spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_daemon_err_becomes_command_error() {
        let path = temp_socket();
        let _requests = canned_daemon(&path, "ERR HID device not available\n");
        let service = service_for(&path);

        let result = service
            .press_key(KeyRequest {
                key: "enter".into(),
                modifiers: vec![],
            })
            .await;

        match result {
            Err(CommandError::Daemon(message)) => assert_eq!(message, "HID device not available"),
            other => panic!("expected daemon error, got {other:?}"),
        }
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_status_merges_daemon_and_adapter() {
        // Arrange
        let path = temp_socket();
        let _requests = canned_daemon(&path, "OK {\"connected\":true,\"device\":\"/dev/hidg0\"}\n");
        let mut adapter = MockAdapterProperties::new();
        adapter.expect_powered().returning(|| Ok(true));
        adapter.expect_discoverable().returning(|| Ok(false));
        let service = service_for(&path).with_adapter(Arc::new(adapter));

        // Act
        let status = service.status().await;

        // Assert
        assert_eq!(status["connected"], json!(true));
        assert_eq!(status["device"], json!("/dev/hidg0"));
        assert_eq!(status["powered"], json!(true));
        assert_eq!(status["discoverable"], json!(false));
        assert_eq!(status["daemon_state"], json!("running"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_status_reports_adapter_error() {
        let path = temp_socket();
        let _requests = canned_daemon(&path, "OK {}\n");
        let mut adapter = MockAdapterProperties::new();
        adapter
            .expect_powered()
            .returning(|| Err(AdapterError::Unavailable));
        let service = service_for(&path).with_adapter(Arc::new(adapter));

        let status = service.status().await;

        assert!(status["adapter_error"].as_str().unwrap().contains("no Bluetooth adapter"));
        assert!(status.get("powered").is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_status_keeps_non_json_payload_as_raw() {
        let path = temp_socket();
        let _requests = canned_daemon(&path, "connected\n");
        let service = service_for(&path);

        let status = service.status().await;

        assert_eq!(status["raw"], json!("connected"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_status_without_daemon_reports_error() {
        // Arrange
        let path = temp_socket();
        let service = service_for(&path);

        // Act
        let status = service.status().await;

        // Assert
        assert!(status["error"].as_str().unwrap().contains("failed to launch daemon"));
        assert_eq!(status["daemon_state"], json!("absent"));
    }

    #[tokio::test]
    async fn test_set_adapter_state_without_adapter_is_unavailable() {
        let service = service_for(&temp_socket());

        let result = service.set_adapter_state(true, true).await;

        assert!(matches!(result, Err(AdapterError::Unavailable)));
    }

    #[tokio::test]
    async fn test_set_adapter_state_forwards_to_adapter() {
        let mut adapter = MockAdapterProperties::new();
        adapter
            .expect_set_state()
            .withf(|powered, discoverable| *powered && !*discoverable)
            .times(1)
            .returning(|_, _| Ok(()));
        let service = service_for(&temp_socket()).with_adapter(Arc::new(adapter));

        service.set_adapter_state(true, false).await.unwrap();
    }

    #[test]
    fn test_status_fields_empty_payload_is_empty_object() {
        assert!(status_fields(&Response::ok()).is_empty());
        assert!(status_fields(&Response::ok_with("  ")).is_empty());
    }
}
