//! Client side of the control socket.
//!
//! One connection per command: connect, write the framed request, read
//! until a newline or EOF, decode the response.

use std::path::{Path, PathBuf};

use hidbridge_core::{decode_response, encode_command, Command, Response};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use crate::infrastructure::supervisor::SupervisionError;

/// Error returned when a command could not be carried out.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The daemon could not be started or reached.
    #[error(transparent)]
    Supervision(#[from] SupervisionError),

    #[error("failed to connect to daemon socket {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("control socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The daemon answered `ERR <message>`.
    #[error("daemon error: {0}")]
    Daemon(String),

    #[error("daemon closed the connection without a response")]
    EmptyResponse,

    /// The request could not be turned into a command.
    #[error("invalid request: {0}")]
    Request(#[from] hidbridge_core::ProtocolError),
}

/// Sends one command and returns the decoded response.
///
/// `ERR` responses are returned as [`Response::Err`]; converting them into
/// [`CommandError::Daemon`] is up to the caller.
///
/// # Errors
///
/// Returns [`CommandError::Connect`] if nothing listens on `socket`,
/// [`CommandError::Io`] on read/write failure, and
/// [`CommandError::EmptyResponse`] if the daemon hung up without answering.
pub async fn send_command(socket: &Path, command: &Command) -> Result<Response, CommandError> {
    let mut stream = UnixStream::connect(socket)
        .await
        .map_err(|source| CommandError::Connect {
            path: socket.to_path_buf(),
            source,
        })?;

    let line = encode_command(command);
    debug!("-> {}", line.trim_end());
    stream.write_all(line.as_bytes()).await?;

    let mut reader = BufReader::new(stream);
    let mut response = String::new();
    reader.read_line(&mut response).await?;
    if response.is_empty() {
        return Err(CommandError::EmptyResponse);
    }
    debug!("<- {}", response.trim_end());
    Ok(decode_response(&response))
}

/// `true` if something accepts connections on `socket`.
pub async fn is_listening(socket: &Path) -> bool {
    UnixStream::connect(socket).await.is_ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
