//! Integration tests for the supervisor against a real daemon server.
//!
//! The launcher below starts `hidbridge_daemon::infrastructure::run_server`
//! as a tokio task with an in-memory report sink instead of forking
//! `hidbridged`, so the socket protocol, warm-up polling and graceful
//! shutdown are exercised end to end without touching a USB gadget.

use std::io;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use hidbridge_core::{Command, Response};
use hidbridge_ctl::application::{HidService, TypeReport};
use hidbridge_ctl::domain::{MoveRequest, SupervisorConfig, TypeRequest};
use hidbridge_ctl::infrastructure::{
    DaemonLauncher, DaemonProcess, DaemonState, DaemonSupervisor, ShutdownOutcome,
};
use hidbridge_daemon::application::emit_reports::{ReportSink, ReportWriter, WriterTiming};
use hidbridge_daemon::application::handle_command::CommandHandler;
use hidbridge_daemon::domain::config::SocketConfig;
use hidbridge_daemon::infrastructure::device_node::HidgDevice;
use hidbridge_daemon::infrastructure::recording_sink::RecordingSink;
use hidbridge_daemon::infrastructure::run_server;
use tokio::task::JoinHandle;

// ── In-process daemon ─────────────────────────────────────────────────────────

struct InProcessDaemon {
    running: Arc<AtomicBool>,
    server: JoinHandle<anyhow::Result<()>>,
}

fn describe(result: Result<anyhow::Result<()>, tokio::task::JoinError>) -> String {
    match result {
        Ok(Ok(())) => "exited cleanly".to_string(),
        Ok(Err(e)) => format!("server error: {e}"),
        Err(e) => format!("task ended: {e}"),
    }
}

#[async_trait]
impl DaemonProcess for InProcessDaemon {
    fn id(&self) -> Option<u32> {
        None
    }

    fn try_wait(&mut self) -> io::Result<Option<String>> {
        Ok(self.server.is_finished().then(|| "exited".to_string()))
    }

    async fn wait(&mut self) -> io::Result<String> {
        Ok(describe((&mut self.server).await))
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.running.store(false, Ordering::Relaxed);
        self.server.abort();
        Ok(())
    }
}

/// Starts one daemon server task per launch and keeps each one's sink.
#[derive(Default)]
struct InProcessLauncher {
    sinks: Mutex<Vec<Arc<RecordingSink>>>,
}

impl InProcessLauncher {
    fn latest_sink(&self) -> Arc<RecordingSink> {
        Arc::clone(self.sinks.lock().unwrap().last().expect("no daemon launched"))
    }
}

impl DaemonLauncher for InProcessLauncher {
    fn launch(&self, config: &SupervisorConfig) -> io::Result<Box<dyn DaemonProcess>> {
        let sink = Arc::new(RecordingSink::new());
        self.sinks.lock().unwrap().push(Arc::clone(&sink));

        let running = Arc::new(AtomicBool::new(true));
        let writer = ReportWriter::new(sink as Arc<dyn ReportSink>, WriterTiming::immediate());
        let handler = Arc::new(CommandHandler::new(
            writer,
            HidgDevice::new("/nonexistent/hidg0"),
            None,
            config.socket_path.clone(),
            Arc::clone(&running),
        ));
        let socket = SocketConfig {
            path: config.socket_path.clone(),
            ..SocketConfig::default()
        };
        let server = {
            let running = Arc::clone(&running);
            tokio::spawn(async move { run_server(&socket, handler, running).await })
        };
        Ok(Box::new(InProcessDaemon { running, server }))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn temp_socket() -> PathBuf {
    std::env::temp_dir().join(format!("hidctl-it-{}.sock", uuid::Uuid::new_v4()))
}

fn supervisor(socket: PathBuf) -> (Arc<DaemonSupervisor>, Arc<InProcessLauncher>) {
    let launcher = Arc::new(InProcessLauncher::default());
    let config = SupervisorConfig {
        socket_path: socket,
        warmup_timeout: Duration::from_secs(2),
        warmup_poll: Duration::from_millis(10),
        ..SupervisorConfig::default()
    };
    let supervisor = Arc::new(DaemonSupervisor::new(
        config,
        Arc::clone(&launcher) as Arc<dyn DaemonLauncher>,
    ));
    (supervisor, launcher)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_callers_share_one_daemon() {
    // Arrange
    let (supervisor, _launcher) = supervisor(temp_socket());

    // Act
    let calls: Vec<_> = (0..8)
        .map(|_| {
            let supervisor = Arc::clone(&supervisor);
            tokio::spawn(async move { supervisor.send(&Command::Status).await })
        })
        .collect();
    for call in calls {
        assert!(call.await.unwrap().unwrap().is_ok());
    }

    // Assert
    assert_eq!(supervisor.spawn_count(), 1);
    assert_eq!(supervisor.state(), DaemonState::Running);
    assert_eq!(supervisor.shutdown().await, ShutdownOutcome::Graceful);
}

#[tokio::test]
async fn test_type_reaches_the_report_sink() {
    // Arrange
    let (supervisor, launcher) = supervisor(temp_socket());
    let service = HidService::new(Arc::clone(&supervisor));

    // Act
    let report = service
        .type_text(TypeRequest { text: "Hi".into() })
        .await
        .unwrap();

    // Assert
    assert_eq!(
        report,
        Some(TypeReport {
            typed: 2,
            skipped: vec![],
        })
    );
    // Two characters, each a press and a release.
    assert_eq!(launcher.latest_sink().reports().len(), 4);
    service.shutdown_daemon().await;
}

#[tokio::test]
async fn test_status_reports_running_daemon() {
    let (supervisor, _launcher) = supervisor(temp_socket());
    let service = HidService::new(Arc::clone(&supervisor));

    let status = service.status().await;

    assert_eq!(status["device_exists"], serde_json::json!(false));
    assert_eq!(status["daemon_state"], serde_json::json!("running"));
    service.shutdown_daemon().await;
}

#[tokio::test]
async fn test_shutdown_command_stops_daemon_and_next_call_respawns() {
    // Arrange
    let socket = temp_socket();
    let (supervisor, _launcher) = supervisor(socket.clone());
    let service = HidService::new(Arc::clone(&supervisor));
    service
        .move_pointer(MoveRequest {
            x: 5,
            y: 5,
            wheel: None,
        })
        .await
        .unwrap();

    // Act
    let response = supervisor.send(&Command::Shutdown).await.unwrap();

    // Assert
    assert_eq!(response, Response::ok());
    assert_eq!(supervisor.state(), DaemonState::Absent);
    assert!(!socket.exists());

    service.move_pointer(MoveRequest::default()).await.unwrap();
    assert_eq!(supervisor.spawn_count(), 2);
    assert_eq!(service.shutdown_daemon().await, ShutdownOutcome::Graceful);
}

#[tokio::test]
async fn test_shutdown_without_daemon_is_not_running() {
    let (supervisor, _launcher) = supervisor(temp_socket());

    assert_eq!(supervisor.shutdown().await, ShutdownOutcome::NotRunning);
    assert_eq!(supervisor.spawn_count(), 0);
}
