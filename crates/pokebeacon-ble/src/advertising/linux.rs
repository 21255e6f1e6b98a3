//! Linux BLE advertising implementation using bluer (BlueZ)

use std::collections::BTreeMap;

use pokebeacon_core::AdvertisementSpec;
use tracing::{debug, info};

use crate::adapter::open_bluez_adapter;
use crate::config::BleRadioConfig;
use crate::error::BleRadioError;

use super::BleAdvertiser;

// ----------------------------------------------------------------------------
// Linux Implementation
// ----------------------------------------------------------------------------

pub struct LinuxAdvertiser {
    session: Option<bluer::Session>,
    adapter: Option<bluer::Adapter>,
    advertisement_handle: Option<bluer::adv::AdvertisementHandle>,
}

impl LinuxAdvertiser {
    pub fn new() -> Self {
        Self {
            session: None,
            adapter: None,
            advertisement_handle: None,
        }
    }

    async fn initialize(&mut self, config: &BleRadioConfig) -> Result<bluer::Adapter, BleRadioError> {
        if let Some(adapter) = &self.adapter {
            return Ok(adapter.clone());
        }

        let session = bluer::Session::new()
            .await
            .map_err(|e| BleRadioError::BlueZ(format!("BlueZ session: {}", e)))?;

        let adapter = open_bluez_adapter(&session, config.adapter_index).await?;

        self.session = Some(session);
        self.adapter = Some(adapter.clone());
        info!("Linux BLE adapter {} initialized for advertising", adapter.name());
        Ok(adapter)
    }
}

impl Default for LinuxAdvertiser {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the BlueZ advertisement for `spec`
fn build_advertisement(spec: &AdvertisementSpec, config: &BleRadioConfig) -> bluer::adv::Advertisement {
    let mut manufacturer_data = BTreeMap::new();
    if let Some(data) = &spec.manufacturer_data {
        manufacturer_data.insert(data.company_id, data.data.clone());
    }

    bluer::adv::Advertisement {
        advertisement_type: bluer::adv::Type::Broadcast,
        local_name: Some(spec.local_name.clone()),
        service_uuids: spec.service_uuids.iter().copied().collect(),
        manufacturer_data,
        discoverable: Some(true),
        min_interval: config.advertise_interval,
        max_interval: config.advertise_interval,
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl BleAdvertiser for LinuxAdvertiser {
    async fn start_advertising(
        &mut self,
        spec: &AdvertisementSpec,
        config: &BleRadioConfig,
    ) -> Result<(), BleRadioError> {
        let adapter = self.initialize(config).await?;

        // Dropping the previous handle unregisters it before the new one goes up
        if self.advertisement_handle.take().is_some() {
            debug!("Replacing running BLE advertisement");
        }

        let handle = adapter
            .advertise(build_advertisement(spec, config))
            .await
            .map_err(|e| BleRadioError::AdvertiseFailed(e.to_string()))?;

        self.advertisement_handle = Some(handle);
        info!("Started BLE advertising as '{}'", spec.local_name);
        Ok(())
    }

    async fn stop_advertising(&mut self) -> Result<(), BleRadioError> {
        if let Some(handle) = self.advertisement_handle.take() {
            drop(handle); // Dropping the handle stops advertising
            info!("Stopped BLE advertising");
        }
        Ok(())
    }

    fn is_advertising(&self) -> bool {
        self.advertisement_handle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokebeacon_core::ManufacturerData;
    use uuid::Uuid;

    #[test]
    fn test_advertisement_carries_both_channels() {
        let service = Uuid::from_u128(0x12345678_1234_5678_1234_56789ABCDEF0);
        let spec = AdvertisementSpec {
            local_name: "Pokemon:Mew".to_string(),
            service_uuids: vec![service],
            manufacturer_data: Some(ManufacturerData {
                company_id: 0xFFFF,
                data: b"Mew".to_vec(),
            }),
        };

        let advertisement = build_advertisement(&spec, &BleRadioConfig::default());
        assert_eq!(advertisement.local_name.as_deref(), Some("Pokemon:Mew"));
        assert!(advertisement.service_uuids.contains(&service));
        assert_eq!(advertisement.manufacturer_data.get(&0xFFFF), Some(&b"Mew".to_vec()));
        assert_eq!(advertisement.min_interval, None);
    }
}
