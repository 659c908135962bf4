//! USB HID gadget provisioning through configfs.
//!
//! # What is a USB gadget? (for beginners)
//!
//! Boards with a USB device controller (UDC) can act as a USB *peripheral*
//! instead of a host. The kernel's `libcomposite` driver exposes this through
//! configfs: creating directories and writing attribute files under
//! `/sys/kernel/config/usb_gadget/<name>` describes a device, and writing a
//! controller name into its `UDC` file plugs it into the host. With the
//! `usb_f_hid` function the kernel then exposes a character device
//! (`/dev/hidg0`) that accepts raw HID reports.
//!
//! ```text
//! <configfs>/hidcombo/
//!   idVendor idProduct bcdDevice bcdUSB
//!   strings/0x409/{manufacturer,product,serialnumber}
//!   functions/hid.usb0/{protocol,subclass,report_length,report_desc}
//!   configs/c.1/{MaxPower,strings/0x409/configuration}
//!   configs/c.1/hid.usb0 -> functions/hid.usb0
//!   UDC
//! ```
//!
//! # State machine
//!
//! ```text
//! Absent ──provision()──► Configuring ──ok──► Ready
//!                              │
//!                              └──error──► Indeterminate ──provision()──► …
//! ```
//!
//! If the device node already exists, provisioning is a no-op. A failed step
//! is not rolled back; the next `provision()` call starts over and every step
//! tolerates work left behind by an earlier attempt.
//!
//! Concurrent `provision()` calls run one at a time. A caller that waited
//! finds the node in place and returns `Ready` without repeating any step.

pub mod commands;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hidbridge_core::{COMBINED_REPORT_DESCRIPTOR, COMBINED_REPORT_LEN};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::config::{DeviceConfig, GadgetConfig};

pub use commands::{RecordedCommand, RecordingCommands, SystemCommandRunner, SystemCommands};

/// Pause between unbinding and rebinding the UDC during a soft reconnect.
pub const DEFAULT_RECONNECT_PAUSE: Duration = Duration::from_millis(500);

// ── State and errors ──────────────────────────────────────────────────────────

/// Provisioning state of the gadget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GadgetState {
    Absent,
    Configuring,
    Ready,
    /// A previous attempt failed part-way; the tree may be half built.
    Indeterminate,
}

/// One step of the provisioning sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    LoadModules,
    CreateGadgetTree,
    WriteIdentity,
    CreateHidFunction,
    WriteReportDescriptor,
    LinkConfiguration,
    BindUdc,
    CreateDeviceNode,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionStep::LoadModules => "load kernel modules",
            ProvisionStep::CreateGadgetTree => "create gadget tree",
            ProvisionStep::WriteIdentity => "write device identity",
            ProvisionStep::CreateHidFunction => "create HID function",
            ProvisionStep::WriteReportDescriptor => "write report descriptor",
            ProvisionStep::LinkConfiguration => "link configuration",
            ProvisionStep::BindUdc => "bind UDC",
            ProvisionStep::CreateDeviceNode => "create device node",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("gadget provisioning failed at step '{step}': {reason}")]
pub struct ProvisioningError {
    pub step: ProvisionStep,
    pub reason: String,
}

impl ProvisioningError {
    fn new(step: ProvisionStep, reason: impl fmt::Display) -> Self {
        Self {
            step,
            reason: reason.to_string(),
        }
    }
}

/// Adds the failing step to any error.
trait StepContext<T> {
    fn step(self, step: ProvisionStep) -> Result<T, ProvisioningError>;
}

impl<T, E: fmt::Display> StepContext<T> for Result<T, E> {
    fn step(self, step: ProvisionStep) -> Result<T, ProvisioningError> {
        self.map_err(|e| ProvisioningError::new(step, e))
    }
}

// ── Provisioner ───────────────────────────────────────────────────────────────

/// Builds the configfs gadget and the device node.
pub struct GadgetProvisioner {
    gadget: GadgetConfig,
    device: DeviceConfig,
    commands: Arc<dyn SystemCommands>,
    state: Mutex<GadgetState>,
    /// Held for a whole provisioning run or soft reconnect.
    run_lock: tokio::sync::Mutex<()>,
    reconnect_pause: Duration,
}

impl GadgetProvisioner {
    pub fn new(gadget: GadgetConfig, device: DeviceConfig, commands: Arc<dyn SystemCommands>) -> Self {
        let initial = if device.path.exists() {
            GadgetState::Ready
        } else {
            GadgetState::Absent
        };
        Self {
            gadget,
            device,
            commands,
            state: Mutex::new(initial),
            run_lock: tokio::sync::Mutex::new(()),
            reconnect_pause: DEFAULT_RECONNECT_PAUSE,
        }
    }

    pub fn with_reconnect_pause(mut self, pause: Duration) -> Self {
        self.reconnect_pause = pause;
        self
    }

    pub fn state(&self) -> GadgetState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(GadgetState::Indeterminate)
    }

    fn set_state(&self, next: GadgetState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    /// Makes sure the device node exists, building the gadget if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError`] naming the first step that failed. The
    /// state is then [`GadgetState::Indeterminate`].
    pub async fn provision(&self) -> Result<GadgetState, ProvisioningError> {
        if self.device.path.exists() {
            self.set_state(GadgetState::Ready);
            return Ok(GadgetState::Ready);
        }

        let _run = self.run_lock.lock().await;
        // Another caller may have finished while we waited.
        if self.device.path.exists() {
            self.set_state(GadgetState::Ready);
            return Ok(GadgetState::Ready);
        }

        info!(
            "provisioning USB HID gadget '{}' for {}",
            self.gadget.name,
            self.device.path.display()
        );
        self.set_state(GadgetState::Configuring);

        match self.run_steps().await {
            Ok(()) => {
                self.set_state(GadgetState::Ready);
                info!("USB HID gadget ready at {}", self.device.path.display());
                Ok(GadgetState::Ready)
            }
            Err(e) => {
                self.set_state(GadgetState::Indeterminate);
                warn!("{e}");
                Err(e)
            }
        }
    }

    async fn run_steps(&self) -> Result<(), ProvisioningError> {
        let dir = self.gadget.gadget_dir();

        info!("step: {}", ProvisionStep::LoadModules);
        for module in &self.gadget.kernel_modules {
            self.commands
                .load_module(module)
                .await
                .step(ProvisionStep::LoadModules)?;
        }

        if self.bound_udc().is_some() {
            // A bound gadget rejects attribute writes with EBUSY; only the
            // node is missing.
            info!("gadget already bound, skipping configfs setup");
        } else {
            self.create_tree(&dir)?;
            self.write_identity(&dir)?;
            self.create_function(&dir)?;
            self.write_descriptor(&dir)?;
            self.link_configuration(&dir)?;
            self.bind_udc(&dir)?;
        }

        self.create_device_node().await
    }

    fn create_tree(&self, dir: &Path) -> Result<(), ProvisioningError> {
        info!("step: {}", ProvisionStep::CreateGadgetTree);
        create_dir(&dir.join("strings/0x409")).step(ProvisionStep::CreateGadgetTree)
    }

    fn write_identity(&self, dir: &Path) -> Result<(), ProvisioningError> {
        let step = ProvisionStep::WriteIdentity;
        info!("step: {step}");
        let g = &self.gadget;
        write_attr(dir, "idVendor", &hex16(g.vendor_id)).step(step)?;
        write_attr(dir, "idProduct", &hex16(g.product_id)).step(step)?;
        write_attr(dir, "bcdDevice", &hex16(g.bcd_device)).step(step)?;
        write_attr(dir, "bcdUSB", &hex16(g.bcd_usb)).step(step)?;
        let strings = dir.join("strings/0x409");
        write_attr(&strings, "manufacturer", &g.manufacturer).step(step)?;
        write_attr(&strings, "product", &g.product).step(step)?;
        write_attr(&strings, "serialnumber", &g.serial).step(step)
    }

    fn create_function(&self, dir: &Path) -> Result<(), ProvisioningError> {
        let step = ProvisionStep::CreateHidFunction;
        info!("step: {step}");
        let func = self.function_dir(dir);
        create_dir(&func).step(step)?;
        write_attr(&func, "protocol", "0").step(step)?;
        write_attr(&func, "subclass", "0").step(step)?;
        write_attr(&func, "report_length", &COMBINED_REPORT_LEN.to_string()).step(step)
    }

    fn write_descriptor(&self, dir: &Path) -> Result<(), ProvisioningError> {
        let step = ProvisionStep::WriteReportDescriptor;
        info!("step: {step}");
        std::fs::write(self.function_dir(dir).join("report_desc"), COMBINED_REPORT_DESCRIPTOR)
            .step(step)
    }

    fn link_configuration(&self, dir: &Path) -> Result<(), ProvisioningError> {
        let step = ProvisionStep::LinkConfiguration;
        info!("step: {step}");
        let config = dir.join("configs/c.1");
        create_dir(&config.join("strings/0x409")).step(step)?;
        write_attr(&config.join("strings/0x409"), "configuration", &self.gadget.configuration)
            .step(step)?;
        write_attr(&config, "MaxPower", &self.gadget.max_power.to_string()).step(step)?;

        let link = config.join(&self.gadget.function);
        match std::os::unix::fs::symlink(self.function_dir(dir), &link) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(ProvisioningError::new(step, e)),
        }
    }

    fn bind_udc(&self, dir: &Path) -> Result<(), ProvisioningError> {
        let step = ProvisionStep::BindUdc;
        info!("step: {step}");
        let udc = self.resolve_udc().ok_or_else(|| {
            ProvisioningError::new(
                step,
                format!("no USB device controller in {}", self.gadget.udc_class_dir.display()),
            )
        })?;
        info!("binding gadget to UDC {udc}");
        write_attr(dir, "UDC", &udc).step(step)
    }

    async fn create_device_node(&self) -> Result<(), ProvisioningError> {
        let step = ProvisionStep::CreateDeviceNode;
        info!("step: {step}");
        let path = &self.device.path;
        // The kernel (or udev) may have created the node after binding.
        if !path.exists() {
            self.commands
                .make_char_device(path, self.device.major, self.device.minor)
                .await
                .step(step)?;
        }
        set_mode(path, self.device.mode).step(step)
    }

    fn function_dir(&self, dir: &Path) -> PathBuf {
        dir.join("functions").join(&self.gadget.function)
    }

    // ── UDC helpers ───────────────────────────────────────────────────────────

    /// Controller currently written in the gadget's `UDC` file, if any.
    fn bound_udc(&self) -> Option<String> {
        let content = std::fs::read_to_string(self.gadget.gadget_dir().join("UDC")).ok()?;
        let name = content.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Configured controller, or the first entry of the UDC class directory.
    fn resolve_udc(&self) -> Option<String> {
        if let Some(udc) = &self.gadget.udc {
            return Some(udc.clone());
        }
        let mut names: Vec<String> = std::fs::read_dir(&self.gadget.udc_class_dir)
            .ok()?
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        names.into_iter().next()
    }

    /// Unbinds and rebinds the gadget so the host sees an unplug/replug.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError`] at [`ProvisionStep::BindUdc`] if no
    /// controller is known or the `UDC` file cannot be written.
    pub async fn soft_reconnect(&self) -> Result<(), ProvisioningError> {
        let step = ProvisionStep::BindUdc;
        let udc = self
            .bound_udc()
            .or_else(|| self.resolve_udc())
            .ok_or_else(|| ProvisioningError::new(step, "no UDC to rebind"))?;
        let dir = self.gadget.gadget_dir();
        let _run = self.run_lock.lock().await;

        info!("soft reconnect: unbinding {udc}");
        write_attr(&dir, "UDC", "").step(step)?;
        tokio::time::sleep(self.reconnect_pause).await;
        info!("soft reconnect: rebinding {udc}");
        write_attr(&dir, "UDC", &udc).step(step)
    }

    /// Contents of `/sys/class/udc/<udc>/state` (e.g. `configured`,
    /// `not attached`), or `None` when unknown.
    pub fn udc_state(&self) -> Option<String> {
        let udc = self.bound_udc().or_else(|| self.resolve_udc())?;
        let raw = std::fs::read_to_string(self.gadget.udc_class_dir.join(udc).join("state")).ok()?;
        Some(raw.trim().to_string())
    }
}

// ── File helpers ──────────────────────────────────────────────────────────────

fn create_dir(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
}

fn write_attr(dir: &Path, name: &str, value: &str) -> io::Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, format!("{value}\n"))
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", path.display())))
}

fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

/// USB descriptor fields are written as `0x`-prefixed 4-digit hex.
fn hex16(value: u16) -> String {
    format!("{value:#06x}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
