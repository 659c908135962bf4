//! Control socket server: accept loop and per-connection handling.
//!
//! Each connection carries exactly one request line and one response line:
//!
//! ```text
//! client                         daemon
//!   │  connect(/tmp/hidbridge.sock)  │
//!   │ ── "MOVE 10 -5\n" ───────────► │  decode → CommandHandler::handle
//!   │ ◄─────────────────── "OK\n" ── │
//!   │            close               │
//! ```
//!
//! The accept loop polls the shared `running` flag every 200 ms so a
//! `SHUTDOWN` command or a signal stops the daemon without a new connection
//! having to arrive. The socket file is removed when the loop exits.

use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use hidbridge_core::protocol::{encode_response, ProtocolError, MAX_LINE_LEN};
use hidbridge_core::Response;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::application::handle_command::CommandHandler;
use crate::domain::config::SocketConfig;

/// Interval at which the accept loop re-checks the `running` flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the accept loop until `running` is cleared.
///
/// A stale socket file left by a crashed daemon is removed before binding.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or its permissions set.
pub async fn run_server(
    socket: &SocketConfig,
    handler: Arc<CommandHandler>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let path = socket.path.as_path();
    remove_stale_socket(path)?;

    let listener = UnixListener::bind(path)
        .with_context(|| format!("failed to bind control socket {}", path.display()))?;
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(socket.mode))
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    info!("control socket listening on {}", path.display());

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, _addr))) => {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, handler).await {
                        warn!("control connection error: {e}");
                    }
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection within the poll interval.
            }
        }
    }

    drop(listener);
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("failed to remove socket {}: {e}", path.display());
        }
    }
    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// What the client sent before the first newline or EOF.
#[derive(Debug, PartialEq, Eq)]
enum Request {
    Line(String),
    TooLong,
    InvalidUtf8,
    Empty,
}

/// Reads one request line, executes it, writes one response line.
async fn handle_connection(stream: UnixStream, handler: Arc<CommandHandler>) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();

    let response = match read_request(read_half).await? {
        Request::Line(line) => handler.handle_line(&line).await,
        Request::TooLong => Response::err(ProtocolError::LineTooLong { limit: MAX_LINE_LEN }),
        Request::InvalidUtf8 => {
            debug!("rejecting request that is not valid UTF-8");
            Response::err(ProtocolError::InvalidUtf8)
        }
        Request::Empty => {
            debug!("client closed without sending a command");
            return Ok(());
        }
    };

    write_half.write_all(encode_response(&response).as_bytes()).await?;
    write_half.shutdown().await
}

/// Reads up to the first newline or EOF.
///
/// The command itself may be [`MAX_LINE_LEN`] bytes; the `\r\n` or `\n`
/// terminator does not count.
async fn read_request<R>(reader: R) -> std::io::Result<Request>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut limited = BufReader::new(reader).take(MAX_LINE_LEN as u64 + 2);
    let mut buf = Vec::new();
    limited.read_until(b'\n', &mut buf).await?;

    if buf.is_empty() {
        return Ok(Request::Empty);
    }
    let body = buf.strip_suffix(b"\n").unwrap_or(&buf);
    let body = body.strip_suffix(b"\r").unwrap_or(body);
    if body.len() > MAX_LINE_LEN {
        return Ok(Request::TooLong);
    }
    match String::from_utf8(buf) {
        Ok(line) => Ok(Request::Line(line)),
        Err(_) => Ok(Request::InvalidUtf8),
    }
}

/// Removes a socket file left behind by an earlier run.
fn remove_stale_socket(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("removed stale socket {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove stale socket {}", path.display())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_request_stops_at_newline() {
        let input: &[u8] = b"STATUS\nignored";
        assert_eq!(read_request(input).await.unwrap(), Request::Line("STATUS\n".into()));
    }

    #[tokio::test]
    async fn test_read_request_accepts_eof_without_newline() {
        let input: &[u8] = b"MOVE 1 2";
        assert_eq!(read_request(input).await.unwrap(), Request::Line("MOVE 1 2".into()));
    }

    #[tokio::test]
    async fn test_read_request_empty_connection() {
        let input: &[u8] = b"";
        assert_eq!(read_request(input).await.unwrap(), Request::Empty);
    }

    #[tokio::test]
    async fn test_read_request_rejects_oversized_line() {
        // Arrange
        let mut line = b"TYPE ".to_vec();
        line.extend(std::iter::repeat(b'a').take(MAX_LINE_LEN));
        line.push(b'\n');

        // Act
        let request = read_request(line.as_slice()).await.unwrap();

        // Assert
        assert_eq!(request, Request::TooLong);
    }

    #[tokio::test]
    async fn test_read_request_accepts_line_at_limit() {
        // Arrange
        let mut line = b"TYPE ".to_vec();
        line.extend(std::iter::repeat(b'a').take(MAX_LINE_LEN - 5));
        line.extend_from_slice(b"\r\n");

        // Act
        let request = read_request(line.as_slice()).await.unwrap();

        // Assert
        match request {
            Request::Line(text) => assert_eq!(text.len(), MAX_LINE_LEN + 2),
            other => panic!("expected a line, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_request_flags_invalid_utf8() {
        let input: &[u8] = b"TYPE \xff\xfe\n";
        assert_eq!(read_request(input).await.unwrap(), Request::InvalidUtf8);
    }

    #[test]
    fn test_remove_stale_socket_tolerates_missing_file() {
        let path = std::env::temp_dir().join(format!("hidbridge-missing-{}.sock", uuid::Uuid::new_v4()));
        assert!(remove_stale_socket(&path).is_ok());
    }
}
