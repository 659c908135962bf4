//! Daemon supervisor: spawn once, health-check, graceful-then-forced stop.
//!
//! # Life cycle
//!
//! ```text
//!            ensure_running()                warm-up ok
//! Absent ───────────────────► Starting ────────────────► Running
//!   ▲                            │ exited / unreachable     │
//!   │◄───────────────────────────┘                          │ shutdown()
//!   │                                                       ▼
//!   └──────────────── exited or killed ──────────────── Stopping
//! ```
//!
//! All transitions happen while holding one `tokio::sync::Mutex` around the
//! process handle, so N concurrent `ensure_running()` calls launch at most
//! one daemon. The current [`DaemonState`] is published on a `watch` channel
//! and can be read without that mutex.
//!
//! # Adopting a running daemon
//!
//! When no process is recorded but the socket already accepts connections
//! (a daemon started by the init system, or one left behind with
//! `--keep-daemon`), the supervisor uses it instead of launching a second
//! one. An adopted daemon is never stopped by [`DaemonSupervisor::shutdown`].

use std::io;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hidbridge_core::{Command, Response};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::domain::config::SupervisorConfig;
use crate::infrastructure::socket_client::{is_listening, send_command, CommandError};

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    Absent,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Error)]
pub enum SupervisionError {
    /// The daemon exited before its socket accepted connections.
    #[error("daemon exited during warm-up ({0})")]
    SpawnFailed(String),

    #[error("daemon socket {path} did not accept connections within {timeout:?}")]
    Unreachable {
        path: std::path::PathBuf,
        timeout: Duration,
    },

    #[error("failed to launch daemon: {0}")]
    Io(#[from] io::Error),
}

/// How [`DaemonSupervisor::shutdown`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The daemon exited after `SHUTDOWN`.
    Graceful,
    /// The daemon had to be killed after the shutdown timeout.
    Forced,
    /// No managed daemon was running.
    NotRunning,
}

// ── Process seams ─────────────────────────────────────────────────────────────

/// A launched daemon process.
#[async_trait]
pub trait DaemonProcess: Send {
    fn id(&self) -> Option<u32>;

    /// Exit description if the process has exited, without blocking.
    fn try_wait(&mut self) -> io::Result<Option<String>>;

    /// Waits for the process to exit and describes how it ended.
    async fn wait(&mut self) -> io::Result<String>;

    /// Kills the process and reaps it.
    async fn kill(&mut self) -> io::Result<()>;
}

/// Starts daemon processes.
pub trait DaemonLauncher: Send + Sync {
    fn launch(&self, config: &SupervisorConfig) -> io::Result<Box<dyn DaemonProcess>>;
}

/// Launches the real `hidbridged` executable.
///
/// The child gets its own process group (so a Ctrl+C aimed at the caller
/// does not hit the daemon mid-report), a null stdin, and is killed when its
/// handle is dropped unless `keep_daemon` is set.
#[derive(Debug, Default, Clone)]
pub struct ProcessLauncher;

impl DaemonLauncher for ProcessLauncher {
    fn launch(&self, config: &SupervisorConfig) -> io::Result<Box<dyn DaemonProcess>> {
        let mut cmd = tokio::process::Command::new(&config.daemon_program);
        cmd.arg("--socket")
            .arg(&config.socket_path)
            .args(&config.daemon_args)
            .stdin(Stdio::null())
            .kill_on_drop(!config.keep_daemon)
            .process_group(0);

        match &config.daemon_log {
            Some(path) => {
                let log = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
                cmd.stdout(log.try_clone()?).stderr(log);
            }
            None => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        let child = cmd.spawn()?;
        info!(
            pid = child.id(),
            "launched {} on {}",
            config.daemon_program.display(),
            config.socket_path.display()
        );
        Ok(Box::new(ChildDaemon { child }))
    }
}

struct ChildDaemon {
    child: tokio::process::Child,
}

#[async_trait]
impl DaemonProcess for ChildDaemon {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<String>> {
        Ok(self.child.try_wait()?.map(|status| status.to_string()))
    }

    async fn wait(&mut self) -> io::Result<String> {
        Ok(self.child.wait().await?.to_string())
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}

// ── Supervisor ────────────────────────────────────────────────────────────────

enum Handle {
    None,
    /// Launched by this supervisor.
    Owned(Box<dyn DaemonProcess>),
    /// Found already listening on the socket.
    Adopted,
}

/// Owns the daemon process and routes commands to it.
pub struct DaemonSupervisor {
    config: SupervisorConfig,
    launcher: Arc<dyn DaemonLauncher>,
    handle: Mutex<Handle>,
    state: watch::Sender<DaemonState>,
    spawn_count: AtomicUsize,
}

impl DaemonSupervisor {
    pub fn new(config: SupervisorConfig, launcher: Arc<dyn DaemonLauncher>) -> Self {
        let (state, _) = watch::channel(DaemonState::Absent);
        Self {
            config,
            launcher,
            handle: Mutex::new(Handle::None),
            state,
            spawn_count: AtomicUsize::new(0),
        }
    }

    /// Supervisor that launches the real daemon executable.
    pub fn with_process_launcher(config: SupervisorConfig) -> Self {
        Self::new(config, Arc::new(ProcessLauncher))
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn state(&self) -> DaemonState {
        *self.state.borrow()
    }

    /// Number of daemon processes launched so far.
    pub fn spawn_count(&self) -> usize {
        self.spawn_count.load(Ordering::SeqCst)
    }

    fn set_state(&self, next: DaemonState) {
        self.state.send_replace(next);
    }

    /// Makes sure a daemon is accepting connections, launching one if needed.
    ///
    /// # Errors
    ///
    /// - [`SupervisionError::Io`] if the executable could not be started.
    /// - [`SupervisionError::SpawnFailed`] if it exited during warm-up.
    /// - [`SupervisionError::Unreachable`] if its socket never accepted a
    ///   connection within the warm-up interval; the process is killed.
    pub async fn ensure_running(&self) -> Result<(), SupervisionError> {
        let mut handle = self.handle.lock().await;

        let listening = match &mut *handle {
            Handle::Owned(process) => {
                match process.try_wait() {
                    Ok(None) => return Ok(()),
                    Ok(Some(status)) => warn!("daemon exited ({status}); restarting"),
                    Err(e) => warn!("could not poll daemon ({e}); restarting"),
                }
                false
            }
            Handle::Adopted => {
                if is_listening(&self.config.socket_path).await {
                    return Ok(());
                }
                warn!("adopted daemon stopped answering; launching our own");
                false
            }
            Handle::None => is_listening(&self.config.socket_path).await,
        };

        if listening {
            info!(
                "using daemon already listening on {}",
                self.config.socket_path.display()
            );
            *handle = Handle::Adopted;
            self.set_state(DaemonState::Running);
            return Ok(());
        }
        *handle = Handle::None;

        self.set_state(DaemonState::Starting);
        let mut process = match self.launcher.launch(&self.config) {
            Ok(process) => process,
            Err(e) => {
                self.set_state(DaemonState::Absent);
                return Err(e.into());
            }
        };
        self.spawn_count.fetch_add(1, Ordering::SeqCst);

        match self.warm_up(process.as_mut()).await {
            Ok(()) => {
                info!(pid = process.id(), "daemon ready");
                *handle = Handle::Owned(process);
                self.set_state(DaemonState::Running);
                Ok(())
            }
            Err(e) => {
                if let Err(kill_err) = process.kill().await {
                    debug!("kill after failed warm-up: {kill_err}");
                }
                self.set_state(DaemonState::Absent);
                Err(e)
            }
        }
    }

    async fn warm_up(&self, process: &mut dyn DaemonProcess) -> Result<(), SupervisionError> {
        let deadline = Instant::now() + self.config.warmup_timeout;
        loop {
            if let Some(status) = process.try_wait()? {
                return Err(SupervisionError::SpawnFailed(status));
            }
            if is_listening(&self.config.socket_path).await {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SupervisionError::Unreachable {
                    path: self.config.socket_path.clone(),
                    timeout: self.config.warmup_timeout,
                });
            }
            sleep(self.config.warmup_poll).await;
        }
    }

    /// Sends `command`, starting the daemon first if needed.
    ///
    /// `SHUTDOWN` never starts a daemon: a managed daemon goes through
    /// [`shutdown`](Self::shutdown), anything else gets the command directly.
    ///
    /// # Errors
    ///
    /// `ERR` responses become [`CommandError::Daemon`]; see
    /// [`ensure_running`](Self::ensure_running) and
    /// [`send_command`] for the rest.
    pub async fn send(&self, command: &Command) -> Result<Response, CommandError> {
        if matches!(command, Command::Shutdown) {
            return self.request_shutdown().await;
        }

        self.ensure_running().await?;
        match send_command(&self.config.socket_path, command).await? {
            Response::Err(message) => Err(CommandError::Daemon(message)),
            response => Ok(response),
        }
    }

    async fn request_shutdown(&self) -> Result<Response, CommandError> {
        let mut handle = self.handle.lock().await;
        if let Handle::Owned(_) = &*handle {
            self.shutdown_locked(&mut handle).await;
            return Ok(Response::ok());
        }

        let response = send_command(&self.config.socket_path, &Command::Shutdown).await?;
        *handle = Handle::None;
        self.set_state(DaemonState::Absent);
        match response {
            Response::Err(message) => Err(CommandError::Daemon(message)),
            response => Ok(response),
        }
    }

    /// Stops the daemon this supervisor launched.
    ///
    /// Sends `SHUTDOWN` over the socket, waits up to `shutdown_timeout`, and
    /// kills the process if it is still alive. Always clears the handle. An
    /// adopted daemon is left running.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        let mut handle = self.handle.lock().await;
        self.shutdown_locked(&mut handle).await
    }

    async fn shutdown_locked(&self, handle: &mut Handle) -> ShutdownOutcome {
        let previous = std::mem::replace(handle, Handle::None);
        let Handle::Owned(mut process) = previous else {
            self.set_state(DaemonState::Absent);
            return ShutdownOutcome::NotRunning;
        };

        if let Ok(Some(status)) = process.try_wait() {
            debug!("daemon already exited ({status})");
            self.set_state(DaemonState::Absent);
            return ShutdownOutcome::NotRunning;
        }

        self.set_state(DaemonState::Stopping);
        if let Err(e) = send_command(&self.config.socket_path, &Command::Shutdown).await {
            warn!("SHUTDOWN not delivered: {e}");
        }

        let outcome = match timeout(self.config.shutdown_timeout, process.wait()).await {
            Ok(Ok(status)) => {
                info!("daemon exited ({status})");
                ShutdownOutcome::Graceful
            }
            Ok(Err(e)) => {
                warn!("waiting for daemon failed ({e}); killing");
                kill_quietly(process.as_mut()).await;
                ShutdownOutcome::Forced
            }
            Err(_) => {
                warn!(
                    "daemon did not exit within {:?}; killing",
                    self.config.shutdown_timeout
                );
                kill_quietly(process.as_mut()).await;
                ShutdownOutcome::Forced
            }
        };
        self.set_state(DaemonState::Absent);
        outcome
    }
}

async fn kill_quietly(process: &mut dyn DaemonProcess) {
    if let Err(e) = process.kill().await {
        warn!("failed to kill daemon: {e}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
