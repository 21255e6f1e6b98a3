//! [`RadioDriver`] implementation backed by the host Bluetooth stack

use pokebeacon_core::{
    AdvertiseHandle, AdvertisementSpec, RadioDriver, RadioError, ScanEventSender, ScanFilter,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::advertising::{BleAdvertiser, PlatformAdvertiser};
use crate::central::BleCentral;
use crate::config::BleRadioConfig;
use crate::error::BleRadioError;

// ----------------------------------------------------------------------------
// Advertiser Slot
// ----------------------------------------------------------------------------

struct AdvertiserSlot {
    advertiser: PlatformAdvertiser,
    active: Option<AdvertiseHandle>,
    next_handle: u64,
}

impl AdvertiserSlot {
    fn new(advertiser: PlatformAdvertiser) -> Self {
        Self {
            advertiser,
            active: None,
            next_handle: 0,
        }
    }

    fn issue_handle(&mut self) -> AdvertiseHandle {
        self.next_handle += 1;
        let handle = AdvertiseHandle(self.next_handle);
        self.active = Some(handle);
        handle
    }
}

// ----------------------------------------------------------------------------
// BLE Radio
// ----------------------------------------------------------------------------

/// Host BLE radio: btleplug for scanning, the platform advertiser for broadcasts
pub struct BleRadio {
    config: BleRadioConfig,
    central: BleCentral,
    slot: Mutex<AdvertiserSlot>,
}

impl BleRadio {
    pub fn new(config: BleRadioConfig) -> Self {
        Self::with_advertiser(config, PlatformAdvertiser::new())
    }

    pub fn with_advertiser(config: BleRadioConfig, advertiser: PlatformAdvertiser) -> Self {
        Self {
            central: BleCentral::new(config.clone()),
            config,
            slot: Mutex::new(AdvertiserSlot::new(advertiser)),
        }
    }

    pub fn config(&self) -> &BleRadioConfig {
        &self.config
    }

    /// Whether a broadcast is on air
    pub async fn is_advertising(&self) -> bool {
        self.slot.lock().await.advertiser.is_advertising()
    }
}

impl Default for BleRadio {
    fn default() -> Self {
        Self::new(BleRadioConfig::default())
    }
}

#[async_trait::async_trait]
impl RadioDriver for BleRadio {
    async fn acquire(&self) -> Result<(), RadioError> {
        self.central.initialize().await?;
        Ok(())
    }

    async fn release(&self) -> Result<(), RadioError> {
        let mut slot = self.slot.lock().await;
        if slot.active.take().is_some() {
            if let Err(e) = slot.advertiser.stop_advertising().await {
                warn!("Failed to stop advertising on release: {}", e);
            }
        }
        drop(slot);

        self.central.release().await?;
        info!("BLE radio released");
        Ok(())
    }

    async fn start_scan(&self, filter: ScanFilter, sink: ScanEventSender) -> Result<(), RadioError> {
        self.central.start_scan(filter, sink).await?;
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), RadioError> {
        self.central.stop_scan().await?;
        Ok(())
    }

    async fn start_advertise(&self, spec: AdvertisementSpec) -> Result<AdvertiseHandle, RadioError> {
        let mut slot = self.slot.lock().await;
        slot.advertiser
            .start_advertising(&spec, &self.config)
            .await?;
        let handle = slot.issue_handle();
        debug!("Broadcast {} on air", handle.0);
        Ok(handle)
    }

    async fn stop_advertise(&self, handle: AdvertiseHandle) -> Result<(), RadioError> {
        let mut slot = self.slot.lock().await;
        if slot.active != Some(handle) {
            return Err(BleRadioError::UnknownBroadcast { handle: handle.0 }.into());
        }
        slot.advertiser.stop_advertising().await?;
        slot.active = None;
        debug!("Broadcast {} off air", handle.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertising::fallback::FallbackAdvertiser;

    fn fallback_radio() -> BleRadio {
        BleRadio::with_advertiser(
            BleRadioConfig::default(),
            PlatformAdvertiser::Fallback(FallbackAdvertiser::new()),
        )
    }

    #[tokio::test]
    async fn test_unsupported_advertising_surfaces_as_not_supported() {
        let radio = fallback_radio();
        let spec = AdvertisementSpec {
            local_name: "Pokemon:Mew".to_string(),
            service_uuids: Vec::new(),
            manufacturer_data: None,
        };

        let err = radio.start_advertise(spec).await.unwrap_err();
        assert!(matches!(err, RadioError::NotSupported { .. }));
        assert!(!radio.is_advertising().await);
    }

    #[tokio::test]
    async fn test_stop_unknown_broadcast_fails() {
        let radio = fallback_radio();
        let err = radio.stop_advertise(AdvertiseHandle(7)).await.unwrap_err();
        assert_eq!(err, RadioError::UnknownBroadcast { handle: 7 });
    }

    #[tokio::test]
    async fn test_release_without_acquire_is_clean() {
        let radio = fallback_radio();
        assert!(radio.release().await.is_ok());
        assert!(radio.stop_scan().await.is_ok());
    }
}
