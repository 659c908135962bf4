//! Integration tests for the control socket server.
//!
//! Each test starts `run_server` on a unique temporary socket with an
//! in-memory report sink, talks to it over a real `UnixStream`, and checks
//! both the response lines and the reports that reached the sink.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use hidbridge_core::protocol::MAX_LINE_LEN;
use hidbridge_daemon::application::emit_reports::{ReportSink, ReportWriter, WriterTiming};
use hidbridge_daemon::application::handle_command::CommandHandler;
use hidbridge_daemon::domain::config::SocketConfig;
use hidbridge_daemon::infrastructure::device_node::HidgDevice;
use hidbridge_daemon::infrastructure::recording_sink::RecordingSink;
use hidbridge_daemon::infrastructure::run_server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Harness {
    socket: PathBuf,
    sink: Arc<RecordingSink>,
    running: Arc<AtomicBool>,
    server: JoinHandle<anyhow::Result<()>>,
}

async fn start_server() -> Harness {
    let socket = std::env::temp_dir().join(format!("hidbridge-it-{}.sock", uuid::Uuid::new_v4()));
    let sink = Arc::new(RecordingSink::new());
    let running = Arc::new(AtomicBool::new(true));

    let writer = ReportWriter::new(Arc::clone(&sink) as Arc<dyn ReportSink>, WriterTiming::immediate());
    let handler = Arc::new(CommandHandler::new(
        writer,
        HidgDevice::new("/nonexistent/hidg0"),
        None,
        socket.clone(),
        Arc::clone(&running),
    ));

    let config = SocketConfig {
        path: socket.clone(),
        ..SocketConfig::default()
    };
    let server = {
        let running = Arc::clone(&running);
        tokio::spawn(async move { run_server(&config, handler, running).await })
    };

    // Wait for the listener to appear.
    for _ in 0..100 {
        if UnixStream::connect(&socket).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    Harness { socket, sink, running, server }
}

async fn send_line(socket: &PathBuf, line: &str) -> String {
    send_bytes(socket, line.as_bytes()).await
}

async fn send_bytes(socket: &PathBuf, bytes: &[u8]) -> String {
    let mut stream = UnixStream::connect(socket).await.expect("connect");
    stream.write_all(bytes).await.expect("write");
    let mut response = String::new();
    stream.read_to_string(&mut response).await.expect("read");
    response
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_type_over_socket_writes_reports() {
    // Arrange
    let h = start_server().await;

    // Act
    let response = send_line(&h.socket, "TYPE Hi!\n").await;

    // Assert
    assert_eq!(response, "OK {\"typed\":3,\"skipped\":[]}\n");
    let presses: Vec<(u8, u8)> = h
        .sink
        .reports()
        .iter()
        .filter(|r| !r.is_release())
        .map(|r| (r.as_bytes()[0], r.as_bytes()[2]))
        .collect();
    assert_eq!(presses, vec![(0x02, 0x0B), (0x00, 0x0C), (0x02, 0x1E)]);

    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_move_and_unknown_command_responses() {
    let h = start_server().await;

    assert_eq!(send_line(&h.socket, "MOVE 200 -300\n").await, "OK\n");
    assert_eq!(send_line(&h.socket, "FOO\n").await, "ERR unknown command\n");
    assert_eq!(send_line(&h.socket, "MOVE 1\n").await, "ERR MOVE requires X and Y\n");
    assert_eq!(send_line(&h.socket, "CLICK\n").await, "ERR CLICK requires button\n");

    let reports = h.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].mouse_bytes(), &[0x00, 0x7f, 0x81, 0x00]);

    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_escaped_text_is_unescaped_before_typing() {
    let h = start_server().await;

    let response = send_line(&h.socket, "TYPE a\\nb\n").await;

    assert_eq!(response, "OK {\"typed\":3,\"skipped\":[]}\n");
    let codes: Vec<u8> = h
        .sink
        .reports()
        .iter()
        .filter(|r| !r.is_release())
        .map(|r| r.as_bytes()[2])
        .collect();
    assert_eq!(codes, vec![0x04, 0x28, 0x05]);

    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_trailing_backslash_is_typed() {
    // Arrange
    let h = start_server().await;

    // Act
    let response = send_line(&h.socket, "TYPE C:\\\n").await;

    // Assert
    assert_eq!(response, "OK {\"typed\":3,\"skipped\":[]}\n");
    let last_press = h
        .sink
        .reports()
        .into_iter()
        .filter(|r| !r.is_release())
        .last()
        .expect("a key press");
    assert_eq!(last_press.as_bytes()[2], 0x31);

    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_command_of_exactly_max_length_is_accepted() {
    // Arrange
    let h = start_server().await;
    let body = format!("TYPE {}", "a".repeat(MAX_LINE_LEN - 5));
    assert_eq!(body.len(), MAX_LINE_LEN);

    // Act
    let response = send_line(&h.socket, &format!("{body}\n")).await;

    // Assert
    assert_eq!(
        response,
        format!("OK {{\"typed\":{},\"skipped\":[]}}\n", MAX_LINE_LEN - 5)
    );

    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_invalid_utf8_is_rejected() {
    let h = start_server().await;

    let response = send_bytes(&h.socket, b"TYPE \xc3\x28\n").await;

    assert_eq!(response, "ERR invalid utf-8\n");
    assert!(h.sink.reports().is_empty());

    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_status_payload_is_json() {
    let h = start_server().await;

    let response = send_line(&h.socket, "status\r\n").await;

    let payload = response
        .strip_prefix("OK ")
        .and_then(|s| s.strip_suffix('\n'))
        .expect("OK payload");
    let value: serde_json::Value = serde_json::from_str(payload).expect("json");
    assert_eq!(value["device_exists"], false);
    assert_eq!(value["socket"], h.socket.display().to_string());

    h.running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_shutdown_stops_server_and_removes_socket() {
    // Arrange
    let h = start_server().await;

    // Act
    let response = send_line(&h.socket, "SHUTDOWN\n").await;
    let result = tokio::time::timeout(Duration::from_secs(2), h.server)
        .await
        .expect("server exits within timeout")
        .expect("task not panicked");

    // Assert
    assert_eq!(response, "OK\n");
    assert!(result.is_ok());
    assert!(!h.socket.exists());
}

#[tokio::test]
async fn test_stale_socket_file_is_replaced() {
    // Arrange: leave a regular file where the socket should go
    let socket = std::env::temp_dir().join(format!("hidbridge-stale-{}.sock", uuid::Uuid::new_v4()));
    std::fs::write(&socket, b"stale").unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let writer = ReportWriter::new(Arc::new(RecordingSink::new()), WriterTiming::immediate());
    let handler = Arc::new(CommandHandler::new(
        writer,
        HidgDevice::new("/nonexistent/hidg0"),
        None,
        socket.clone(),
        Arc::clone(&running),
    ));
    let config = SocketConfig {
        path: socket.clone(),
        ..SocketConfig::default()
    };
    let server = {
        let running = Arc::clone(&running);
        tokio::spawn(async move { run_server(&config, handler, running).await })
    };

    // Act
    let mut connected = false;
    for _ in 0..100 {
        if UnixStream::connect(&socket).await.is_ok() {
            connected = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Assert
    assert!(connected);
    running.store(false, Ordering::Relaxed);
    let _ = tokio::time::timeout(Duration::from_secs(2), server).await;
}
