//! Report sink for `--dry-run`.
//!
//! Logs each report at info level and keeps nothing, so a dry-run daemon
//! can stay up indefinitely.

use std::sync::atomic::{AtomicU64, Ordering};

use hidbridge_core::CombinedReport;
use tracing::info;

use crate::application::emit_reports::{DeviceIoError, ReportSink};

#[derive(Debug, Default)]
pub struct LoggingSink {
    sequence: AtomicU64,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for LoggingSink {
    fn write_report(&self, report: &CombinedReport) -> Result<(), DeviceIoError> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        info!(seq, report = ?report.as_bytes(), "dry-run report");
        Ok(())
    }
}
