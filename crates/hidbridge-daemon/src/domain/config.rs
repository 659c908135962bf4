//! TOML configuration for the daemon.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration for a Raspberry Pi class board:
//!
//! ```toml
//! [daemon]
//! log_level = "info"
//! provision = true
//!
//! [socket]
//! path = "/tmp/hidbridge.sock"
//! mode = 0o666
//!
//! [device]
//! path = "/dev/hidg0"
//! major = 243
//! minor = 0
//!
//! [gadget]
//! name = "hidcombo"
//! # udc = "1000480000.usb"   # first entry of /sys/class/udc when absent
//!
//! [timing]
//! key_release_ms = 10
//! char_delay_ms = 20
//! click_hold_ms = 100
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file. Sections are
//! `#[serde(default)]` as a whole so a file may contain only the one section
//! it wants to change.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    pub daemon: DaemonSection,
    pub socket: SocketConfig,
    pub device: DeviceConfig,
    pub gadget: GadgetConfig,
    pub timing: TimingConfig,
}

/// General daemon behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonSection {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Set up the USB gadget at startup when the device node is missing.
    #[serde(default = "default_true")]
    pub provision: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocketConfig {
    #[serde(default = "default_socket_path")]
    pub path: PathBuf,
    /// Permission bits of the socket file; unprivileged callers need write access.
    #[serde(default = "default_mode")]
    pub mode: u32,
}

/// The HID character device the reports are written to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    #[serde(default = "default_device_path")]
    pub path: PathBuf,
    /// Character device major number passed to `mknod`.
    #[serde(default = "default_major")]
    pub major: u32,
    #[serde(default)]
    pub minor: u32,
    /// Permission bits applied after the node is created.
    #[serde(default = "default_mode")]
    pub mode: u32,
}

/// USB gadget identity and configfs locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GadgetConfig {
    #[serde(default = "default_configfs_root")]
    pub configfs_root: PathBuf,
    #[serde(default = "default_gadget_name")]
    pub name: String,
    #[serde(default = "default_function_name")]
    pub function: String,
    /// Directory listing the available USB device controllers.
    #[serde(default = "default_udc_class_dir")]
    pub udc_class_dir: PathBuf,
    /// Controller to bind; the first entry of `udc_class_dir` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udc: Option<String>,
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,
    #[serde(default = "default_product_id")]
    pub product_id: u16,
    #[serde(default = "default_bcd_device")]
    pub bcd_device: u16,
    #[serde(default = "default_bcd_usb")]
    pub bcd_usb: u16,
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    #[serde(default = "default_product")]
    pub product: String,
    #[serde(default = "default_serial")]
    pub serial: String,
    #[serde(default = "default_configuration")]
    pub configuration: String,
    /// Bus power draw declared by `configs/c.1`, in mA.
    #[serde(default = "default_max_power")]
    pub max_power: u32,
    #[serde(default = "default_kernel_modules")]
    pub kernel_modules: Vec<String>,
}

/// Delays used by the report writer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    /// Hold time between a key press and its release.
    #[serde(default = "default_key_release_ms")]
    pub key_release_ms: u64,
    /// Pause between two typed characters.
    #[serde(default = "default_char_delay_ms")]
    pub char_delay_ms: u64,
    /// Hold time for a mouse click.
    #[serde(default = "default_click_hold_ms")]
    pub click_hold_ms: u64,
}

impl TimingConfig {
    pub fn key_release_delay(&self) -> Duration {
        Duration::from_millis(self.key_release_ms)
    }

    pub fn char_delay(&self) -> Duration {
        Duration::from_millis(self.char_delay_ms)
    }

    pub fn click_hold(&self) -> Duration {
        Duration::from_millis(self.click_hold_ms)
    }
}

impl GadgetConfig {
    /// `<configfs_root>/<name>`.
    pub fn gadget_dir(&self) -> PathBuf {
        self.configfs_root.join(&self.name)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/hidbridge.sock")
}
fn default_device_path() -> PathBuf {
    PathBuf::from("/dev/hidg0")
}
fn default_major() -> u32 {
    243
}
fn default_mode() -> u32 {
    0o666
}
fn default_configfs_root() -> PathBuf {
    PathBuf::from("/sys/kernel/config/usb_gadget")
}
fn default_gadget_name() -> String {
    "hidcombo".to_string()
}
fn default_function_name() -> String {
    "hid.usb0".to_string()
}
fn default_udc_class_dir() -> PathBuf {
    PathBuf::from("/sys/class/udc")
}
fn default_vendor_id() -> u16 {
    0x1d6b // Linux Foundation
}
fn default_product_id() -> u16 {
    0x0106 // Multifunction Composite Gadget
}
fn default_bcd_device() -> u16 {
    0x0100
}
fn default_bcd_usb() -> u16 {
    0x0200
}
fn default_manufacturer() -> String {
    "hidbridge".to_string()
}
fn default_product() -> String {
    "hidbridge HID".to_string()
}
fn default_serial() -> String {
    "0000000001".to_string()
}
fn default_configuration() -> String {
    "Config 1: HID Combo".to_string()
}
fn default_max_power() -> u32 {
    250
}
fn default_kernel_modules() -> Vec<String> {
    vec!["libcomposite".to_string(), "usb_f_hid".to_string()]
}
fn default_key_release_ms() -> u64 {
    10
}
fn default_char_delay_ms() -> u64 {
    20
}
fn default_click_hold_ms() -> u64 {
    100
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            provision: default_true(),
        }
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            path: default_socket_path(),
            mode: default_mode(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: default_device_path(),
            major: default_major(),
            minor: 0,
            mode: default_mode(),
        }
    }
}

impl Default for GadgetConfig {
    fn default() -> Self {
        Self {
            configfs_root: default_configfs_root(),
            name: default_gadget_name(),
            function: default_function_name(),
            udc_class_dir: default_udc_class_dir(),
            udc: None,
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            bcd_device: default_bcd_device(),
            bcd_usb: default_bcd_usb(),
            manufacturer: default_manufacturer(),
            product: default_product(),
            serial: default_serial(),
            configuration: default_configuration(),
            max_power: default_max_power(),
            kernel_modules: default_kernel_modules(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            key_release_ms: default_key_release_ms(),
            char_delay_ms: default_char_delay_ms(),
            click_hold_ms: default_click_hold_ms(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads a [`DaemonConfig`] from `path`, returning the defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<DaemonConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DaemonConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
