//! In-memory report sink for tests.
//!
//! # Why a recording sink?
//!
//! The real sink writes to `/dev/hidg0`, which only exists on a board with a
//! USB device controller and a configured gadget. `RecordingSink` pushes every
//! report into a `Mutex<Vec<...>>` instead, so assertions can inspect exactly
//! which bytes were emitted and in what order.
//!
//! Reports are never dropped, so this sink is unsuitable for a long-running
//! daemon; `--dry-run` uses [`LoggingSink`] instead.
//!
//! [`LoggingSink`]: crate::infrastructure::logging_sink::LoggingSink
//!
//! # `should_fail` flag
//!
//! Construct with [`RecordingSink::failing`] to make every write return a
//! [`DeviceIoError::Write`], which lets tests exercise error paths without a
//! broken device.

use std::path::PathBuf;
use std::sync::Mutex;

use hidbridge_core::CombinedReport;
use tracing::debug;

use crate::application::emit_reports::{DeviceIoError, ReportSink};

/// A sink that records reports without performing any I/O.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<CombinedReport>>,
    /// When `true`, every write fails and nothing is recorded.
    pub should_fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
            should_fail: true,
        }
    }

    /// Snapshot of every report written so far.
    pub fn reports(&self) -> Vec<CombinedReport> {
        self.reports
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.reports.lock() {
            guard.clear();
        }
    }
}

impl ReportSink for RecordingSink {
    fn write_report(&self, report: &CombinedReport) -> Result<(), DeviceIoError> {
        if self.should_fail {
            return Err(DeviceIoError::Write {
                path: PathBuf::from("<recording>"),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "injected failure"),
            });
        }
        debug!(report = ?report.as_bytes(), "report recorded");
        if let Ok(mut guard) = self.reports.lock() {
            guard.push(*report);
        }
        Ok(())
    }
}
