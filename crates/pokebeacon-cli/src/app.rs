//! Application wiring: configuration, radio driver and discovery facade

use std::sync::Arc;

use tracing::info;

use pokebeacon_ble::{BleRadio, DesktopPermissions};
use pokebeacon_core::{DiscoveryFacade, PermissionProvider, RadioDriver};

use crate::config::CliAppConfig;
use crate::error::Result;

/// Pokebeacon CLI application
pub struct PokebeaconApp {
    config: CliAppConfig,
    discovery: DiscoveryFacade,
}

impl PokebeaconApp {
    /// Create the application on top of the host Bluetooth stack
    pub fn new(config: CliAppConfig) -> Self {
        let radio = Arc::new(BleRadio::new(config.ble.clone()));
        let permissions = Arc::new(DesktopPermissions::from_config(&config.ble));
        Self::with_collaborators(config, radio, permissions)
    }

    /// Create the application with explicit radio and permission collaborators
    pub fn with_collaborators(
        config: CliAppConfig,
        radio: Arc<dyn RadioDriver>,
        permissions: Arc<dyn PermissionProvider>,
    ) -> Self {
        let discovery = DiscoveryFacade::new(config.discovery.clone(), radio, permissions);
        info!(
            "Discovery ready (prefix '{}', window {}ms)",
            config.discovery.name_prefix, config.discovery.scan_timeout_ms
        );
        Self { config, discovery }
    }

    pub fn config(&self) -> &CliAppConfig {
        &self.config
    }

    pub fn discovery(&mut self) -> &mut DiscoveryFacade {
        &mut self.discovery
    }

    /// Stop both roles and release the radio
    pub async fn stop(&mut self) -> Result<()> {
        self.discovery.shutdown().await?;
        info!("Pokebeacon stopped");
        Ok(())
    }
}
