//! External programs run during provisioning.
//!
//! Loading kernel modules and creating the device node need `modprobe` and
//! `mknod`. They sit behind [`SystemCommands`] so provisioning can be tested
//! against a temporary directory with [`RecordingCommands`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

#[async_trait]
pub trait SystemCommands: Send + Sync {
    /// Loads kernel module `name`.
    async fn load_module(&self, name: &str) -> io::Result<()>;

    /// Creates character device `path` with the given major/minor numbers.
    async fn make_char_device(&self, path: &Path, major: u32, minor: u32) -> io::Result<()>;
}

/// Runs the real `modprobe` and `mknod` binaries.
#[derive(Debug, Default, Clone)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    async fn run(program: &str, args: &[String]) -> io::Result<()> {
        debug!("running {program} {}", args.join(" "));
        let output = Command::new(program).args(args).output().await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(io::Error::other(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }
}

#[async_trait]
impl SystemCommands for SystemCommandRunner {
    async fn load_module(&self, name: &str) -> io::Result<()> {
        Self::run("modprobe", &[name.to_string()]).await
    }

    async fn make_char_device(&self, path: &Path, major: u32, minor: u32) -> io::Result<()> {
        Self::run(
            "mknod",
            &[
                path.display().to_string(),
                "c".to_string(),
                major.to_string(),
                minor.to_string(),
            ],
        )
        .await
    }
}

/// One call recorded by [`RecordingCommands`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
    LoadModule(String),
    MakeCharDevice { path: PathBuf, major: u32, minor: u32 },
}

/// Test double that records calls instead of running programs.
///
/// `make_char_device` creates an empty regular file at the requested path so
/// later steps (permission changes, writes) find something there.
#[derive(Debug, Default)]
pub struct RecordingCommands {
    calls: Mutex<Vec<RecordedCommand>>,
    /// Module name whose load should fail.
    pub fail_module: Option<String>,
}

impl RecordingCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder whose `load_module(name)` fails.
    pub fn failing_module(name: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_module: Some(name.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCommand> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: RecordedCommand) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl SystemCommands for RecordingCommands {
    async fn load_module(&self, name: &str) -> io::Result<()> {
        self.record(RecordedCommand::LoadModule(name.to_string()));
        // Real modprobe suspends; let concurrent callers interleave here.
        tokio::task::yield_now().await;
        if self.fail_module.as_deref() == Some(name) {
            return Err(io::Error::other(format!("modprobe: FATAL: Module {name} not found")));
        }
        Ok(())
    }

    async fn make_char_device(&self, path: &Path, major: u32, minor: u32) -> io::Result<()> {
        self.record(RecordedCommand::MakeCharDevice {
            path: path.to_path_buf(),
            major,
            minor,
        });
        std::fs::write(path, b"")
    }
}
