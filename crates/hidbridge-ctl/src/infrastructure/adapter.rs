//! Bluetooth adapter bridge over the system D-Bus.
//!
//! Reads and sets the `Powered` and `Discoverable` properties of the BlueZ
//! adapter object (`/org/bluez/hci0`, interface `org.bluez.Adapter1`). There
//! are no retries: a failed call is an [`AdapterError`] that callers fold
//! into their status output.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};
use zbus::proxy;

pub const DEFAULT_ADAPTER_PATH: &str = "/org/bluez/hci0";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),

    #[error("no Bluetooth adapter available")]
    Unavailable,

    #[error("invalid adapter object path {path}: {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Power and visibility of the local Bluetooth adapter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdapterProperties: Send + Sync {
    async fn powered(&self) -> Result<bool, AdapterError>;

    async fn discoverable(&self) -> Result<bool, AdapterError>;

    /// Sets `Powered` first, then `Discoverable`.
    async fn set_state(&self, powered: bool, discoverable: bool) -> Result<(), AdapterError>;
}

#[proxy(interface = "org.bluez.Adapter1", default_service = "org.bluez")]
trait Adapter1 {
    #[zbus(property)]
    fn powered(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn set_powered(&self, value: bool) -> zbus::Result<()>;

    #[zbus(property)]
    fn discoverable(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn set_discoverable(&self, value: bool) -> zbus::Result<()>;
}

/// [`AdapterProperties`] backed by BlueZ on the system bus.
pub struct BluezAdapter {
    proxy: Adapter1Proxy<'static>,
}

impl BluezAdapter {
    /// Connects to the system bus and binds to the adapter at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] if the system bus is unreachable or `path`
    /// is not a valid object path.
    pub async fn connect(path: &str) -> Result<Self, AdapterError> {
        let connection = zbus::Connection::system().await?;
        let proxy = Adapter1Proxy::builder(&connection)
            .path(path.to_string())
            .map_err(|e| AdapterError::InvalidPath {
                path: path.to_string(),
                reason: e.to_string(),
            })?
            .build()
            .await?;
        debug!("bound to Bluetooth adapter {path}");
        Ok(Self { proxy })
    }
}

#[async_trait]
impl AdapterProperties for BluezAdapter {
    async fn powered(&self) -> Result<bool, AdapterError> {
        Ok(self.proxy.powered().await?)
    }

    async fn discoverable(&self) -> Result<bool, AdapterError> {
        Ok(self.proxy.discoverable().await?)
    }

    async fn set_state(&self, powered: bool, discoverable: bool) -> Result<(), AdapterError> {
        self.proxy.set_powered(powered).await?;
        self.proxy.set_discoverable(discoverable).await?;
        info!("Bluetooth adapter set to powered={powered}, discoverable={discoverable}");
        Ok(())
    }
}
