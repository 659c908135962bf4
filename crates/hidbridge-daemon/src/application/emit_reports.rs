//! Report writer: turns high-level input actions into timed sequences of
//! 12-byte reports.
//!
//! This use case sits at the application layer and delegates every write to a
//! [`ReportSink`] trait object. The real sink is
//! [`HidgDevice`](crate::infrastructure::device_node::HidgDevice); tests use
//! [`RecordingSink`](crate::infrastructure::recording_sink::RecordingSink).
//!
//! # Why the delays?
//!
//! A USB host polls the gadget's interrupt endpoint and only sees the latest
//! report. Writing a key press and its release back to back can collapse
//! into "nothing happened", so every press is held for `key_release_delay`
//! and every click for `click_hold` before the release report goes out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hidbridge_core::{
    encode_key, encode_key_release, encode_mouse, plan_text, CombinedReport, HidKeyCode,
    Modifiers, MouseButton, MouseButtons,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::config::TimingConfig;

/// Error raised when one report could not be delivered to the device.
#[derive(Debug, Error)]
pub enum DeviceIoError {
    #[error("failed to open HID device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("short write to {path}: {written} of {expected} bytes")]
    ShortWrite {
        path: PathBuf,
        written: usize,
        expected: usize,
    },
}

/// Destination for combined reports.
///
/// Each call delivers exactly one report; implementations must not buffer.
pub trait ReportSink: Send + Sync {
    fn write_report(&self, report: &CombinedReport) -> Result<(), DeviceIoError>;
}

/// Delays applied between reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterTiming {
    pub key_release_delay: Duration,
    pub char_delay: Duration,
    pub click_hold: Duration,
}

impl WriterTiming {
    /// No delays at all; used by tests and benchmarks.
    pub fn immediate() -> Self {
        Self {
            key_release_delay: Duration::ZERO,
            char_delay: Duration::ZERO,
            click_hold: Duration::ZERO,
        }
    }
}

impl Default for WriterTiming {
    fn default() -> Self {
        WriterTiming::from(&TimingConfig::default())
    }
}

impl From<&TimingConfig> for WriterTiming {
    fn from(cfg: &TimingConfig) -> Self {
        Self {
            key_release_delay: cfg.key_release_delay(),
            char_delay: cfg.char_delay(),
            click_hold: cfg.click_hold(),
        }
    }
}

/// Result of typing a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeOutcome {
    /// Number of characters that produced a keystroke.
    pub typed: usize,
    /// Characters with no key mapping, in input order.
    pub skipped: Vec<char>,
}

/// Emits reports for keyboard and mouse actions.
pub struct ReportWriter {
    sink: Arc<dyn ReportSink>,
    timing: WriterTiming,
}

impl ReportWriter {
    pub fn new(sink: Arc<dyn ReportSink>, timing: WriterTiming) -> Self {
        Self { sink, timing }
    }

    fn emit(&self, report: &CombinedReport) -> Result<(), DeviceIoError> {
        self.sink.write_report(report).map_err(|e| {
            warn!("report write failed: {e}");
            e
        })
    }

    /// Presses `code` with `modifiers`, waits, then releases everything.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceIoError`] if either the press or the release report
    /// could not be written.
    pub async fn send_key_event(
        &self,
        code: HidKeyCode,
        modifiers: Modifiers,
    ) -> Result<(), DeviceIoError> {
        self.emit(&encode_key(code, modifiers))?;
        tokio::time::sleep(self.timing.key_release_delay).await;
        self.emit(&encode_key_release())
    }

    /// Types `text` one keystroke at a time.
    ///
    /// Unmapped characters are skipped and reported in the outcome. The
    /// first failed write aborts the rest of the text.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceIoError`] from the first report that failed.
    pub async fn send_text(&self, text: &str) -> Result<TypeOutcome, DeviceIoError> {
        let plan = plan_text(text);
        for (i, stroke) in plan.strokes.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.timing.char_delay).await;
            }
            self.send_key_event(stroke.code, stroke.modifiers).await?;
        }
        debug!(
            typed = plan.strokes.len(),
            skipped = plan.skipped.len(),
            "text sent"
        );
        Ok(TypeOutcome {
            typed: plan.strokes.len(),
            skipped: plan.skipped,
        })
    }

    /// Presses `button`, holds it, then releases all buttons.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceIoError`] if either report could not be written.
    pub async fn send_mouse_click(&self, button: MouseButton) -> Result<(), DeviceIoError> {
        self.emit(&encode_mouse(MouseButtons::from(button), 0, 0, 0))?;
        tokio::time::sleep(self.timing.click_hold).await;
        self.emit(&encode_mouse(MouseButtons::NONE, 0, 0, 0))
    }

    /// Moves the pointer by (`dx`, `dy`) and scrolls by `wheel` in one report.
    ///
    /// Values outside [-127, 127] are clamped, not split across reports.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceIoError`] if the report could not be written.
    pub async fn send_mouse_move(&self, dx: i32, dy: i32, wheel: i32) -> Result<(), DeviceIoError> {
        self.emit(&encode_mouse(MouseButtons::NONE, dx, dy, wheel))
    }

    /// Scrolls the wheel by `amount` without moving the pointer.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceIoError`] if the report could not be written.
    pub async fn send_scroll(&self, amount: i32) -> Result<(), DeviceIoError> {
        self.emit(&encode_mouse(MouseButtons::NONE, 0, 0, amount))
    }

    /// Writes one all-zero report, releasing every key and button.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceIoError`] if the report could not be written.
    pub async fn release_all(&self) -> Result<(), DeviceIoError> {
        self.emit(&encode_key_release())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
