//! Fallback advertising implementation for unsupported platforms

use pokebeacon_core::AdvertisementSpec;
use tracing::warn;

use crate::config::BleRadioConfig;
use crate::error::BleRadioError;

use super::BleAdvertiser;

// ----------------------------------------------------------------------------
// Fallback Implementation
// ----------------------------------------------------------------------------

/// Advertiser for platforms without peripheral-mode support
///
/// Scanning still works there; every broadcast attempt fails so the
/// advertise session can report it.
#[derive(Debug, Default)]
pub struct FallbackAdvertiser;

impl FallbackAdvertiser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl BleAdvertiser for FallbackAdvertiser {
    async fn start_advertising(
        &mut self,
        spec: &AdvertisementSpec,
        _config: &BleRadioConfig,
    ) -> Result<(), BleRadioError> {
        warn!(
            "BLE advertising not supported on this platform. '{}' will not be discoverable.",
            spec.local_name
        );
        Err(BleRadioError::AdvertisingNotSupported)
    }

    async fn stop_advertising(&mut self) -> Result<(), BleRadioError> {
        Ok(())
    }

    fn is_advertising(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fallback_refuses_to_advertise() {
        let mut advertiser = FallbackAdvertiser::new();
        let spec = AdvertisementSpec {
            local_name: "Pokemon:Mew".to_string(),
            service_uuids: Vec::new(),
            manufacturer_data: None,
        };

        let result = advertiser
            .start_advertising(&spec, &BleRadioConfig::default())
            .await;
        assert_eq!(result, Err(BleRadioError::AdvertisingNotSupported));
        assert!(!advertiser.is_advertising());
        assert!(advertiser.stop_advertising().await.is_ok());
    }
}
