//! Permission provider for desktop hosts
//!
//! Desktop stacks have no runtime permission prompt; access is governed by
//! group membership or OS privacy settings that surface as driver errors.
//! What can be checked up front is whether an adapter exists and is powered.

use pokebeacon_core::{Grant, Permission, PermissionError, PermissionProvider};
use tracing::{debug, info};

use crate::config::BleRadioConfig;
use crate::error::BleRadioError;

// ----------------------------------------------------------------------------
// Adapter Power
// ----------------------------------------------------------------------------

/// Power control of a single adapter
#[async_trait::async_trait]
pub(crate) trait AdapterPower: Sync {
    async fn is_powered(&self) -> Result<bool, BleRadioError>;
    async fn set_powered(&self, on: bool) -> Result<(), BleRadioError>;
}

#[cfg(target_os = "linux")]
#[async_trait::async_trait]
impl AdapterPower for bluer::Adapter {
    async fn is_powered(&self) -> Result<bool, BleRadioError> {
        bluer::Adapter::is_powered(self)
            .await
            .map_err(|e| BleRadioError::BlueZ(e.to_string()))
    }

    async fn set_powered(&self, on: bool) -> Result<(), BleRadioError> {
        bluer::Adapter::set_powered(self, on)
            .await
            .map_err(|e| BleRadioError::BlueZ(format!("Failed to power on adapter: {}", e)))
    }
}

/// Report whether `adapter` is powered, switching it on first when allowed
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) async fn ensure_powered<A: AdapterPower>(
    adapter: &A,
    power_on: bool,
) -> Result<bool, BleRadioError> {
    if adapter.is_powered().await? {
        return Ok(true);
    }
    if !power_on {
        return Ok(false);
    }
    adapter.set_powered(true).await?;
    info!("Powered on BLE adapter");
    Ok(true)
}

// ----------------------------------------------------------------------------
// Desktop Permissions
// ----------------------------------------------------------------------------

/// Grants every permission and reports the adapter power state
#[derive(Debug, Clone, Default)]
pub struct DesktopPermissions {
    adapter_index: usize,
    power_on_adapter: bool,
}

impl DesktopPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the same adapter the radio driver uses
    pub fn from_config(config: &BleRadioConfig) -> Self {
        Self {
            adapter_index: config.adapter_index,
            power_on_adapter: config.power_on_adapter,
        }
    }
}

#[async_trait::async_trait]
impl PermissionProvider for DesktopPermissions {
    async fn request(
        &self,
        permissions: &[Permission],
    ) -> Result<Vec<(Permission, Grant)>, PermissionError> {
        debug!("Desktop host grants {:?} implicitly", permissions);
        Ok(permissions.iter().map(|&p| (p, Grant::Granted)).collect())
    }

    #[cfg(target_os = "linux")]
    async fn radio_enabled(&self) -> Result<bool, PermissionError> {
        let session = bluer::Session::new()
            .await
            .map_err(|e| BleRadioError::BlueZ(format!("BlueZ session: {}", e)))?;
        let adapter = crate::adapter::open_bluez_adapter(&session, self.adapter_index).await?;

        let powered = ensure_powered(&adapter, self.power_on_adapter).await?;
        debug!("Adapter {} powered: {}", adapter.name(), powered);
        Ok(powered)
    }

    #[cfg(not(target_os = "linux"))]
    async fn radio_enabled(&self) -> Result<bool, PermissionError> {
        use btleplug::api::Manager as _;
        use btleplug::platform::Manager;

        let manager = Manager::new()
            .await
            .map_err(|e| BleRadioError::ManagerFailed(e.to_string()))?;
        let adapters = manager
            .adapters()
            .await
            .map_err(|e| BleRadioError::ManagerFailed(e.to_string()))?;

        // Power state is not exposed here; a present adapter counts as enabled
        Ok(adapters.len() > self.adapter_index)
    }
}
