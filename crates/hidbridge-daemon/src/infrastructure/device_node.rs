//! The HID gadget character device (`/dev/hidg0`).
//!
//! Each report is written with its own open/write/close cycle. Holding the
//! node open across commands would keep a stale handle after the gadget is
//! rebound (DISCONNECT) or the node is recreated.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use hidbridge_core::{CombinedReport, COMBINED_REPORT_LEN};

use crate::application::emit_reports::{DeviceIoError, ReportSink};

/// Report sink backed by the gadget device node.
#[derive(Debug, Clone)]
pub struct HidgDevice {
    path: PathBuf,
}

impl HidgDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// `true` if the node can currently be opened for writing.
    pub fn is_writable(&self) -> bool {
        self.exists() && OpenOptions::new().write(true).open(&self.path).is_ok()
    }
}

impl ReportSink for HidgDevice {
    fn write_report(&self, report: &CombinedReport) -> Result<(), DeviceIoError> {
        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|source| DeviceIoError::Open {
                path: self.path.clone(),
                source,
            })?;

        let written = file
            .write(report.as_bytes())
            .map_err(|source| DeviceIoError::Write {
                path: self.path.clone(),
                source,
            })?;

        if written != COMBINED_REPORT_LEN {
            return Err(DeviceIoError::ShortWrite {
                path: self.path.clone(),
                written,
                expected: COMBINED_REPORT_LEN,
            });
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
