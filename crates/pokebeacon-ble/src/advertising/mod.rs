//! Cross-platform advertising trait and platform detection

pub mod fallback;
#[cfg(target_os = "linux")]
pub mod linux;

use pokebeacon_core::AdvertisementSpec;

use crate::config::BleRadioConfig;
use crate::error::BleRadioError;

// ----------------------------------------------------------------------------
// Cross-platform Advertising Trait
// ----------------------------------------------------------------------------

/// BLE advertising across platforms
///
/// One advertiser carries at most one broadcast; starting again replaces it.
#[async_trait::async_trait]
pub trait BleAdvertiser: Send + Sync {
    /// Put `spec` on air
    async fn start_advertising(
        &mut self,
        spec: &AdvertisementSpec,
        config: &BleRadioConfig,
    ) -> Result<(), BleRadioError>;

    /// Take the broadcast off air
    async fn stop_advertising(&mut self) -> Result<(), BleRadioError>;

    /// Check if currently advertising
    fn is_advertising(&self) -> bool;
}

// ----------------------------------------------------------------------------
// Platform Detection and Factory
// ----------------------------------------------------------------------------

/// Platform-specific advertiser enum
pub enum PlatformAdvertiser {
    #[cfg(target_os = "linux")]
    Linux(linux::LinuxAdvertiser),
    #[allow(dead_code)]
    Fallback(fallback::FallbackAdvertiser),
}

impl PlatformAdvertiser {
    /// Create the appropriate advertiser for the current platform
    pub fn new() -> Self {
        #[cfg(target_os = "linux")]
        {
            Self::Linux(linux::LinuxAdvertiser::new())
        }
        #[cfg(not(target_os = "linux"))]
        {
            Self::Fallback(fallback::FallbackAdvertiser::new())
        }
    }
}

impl Default for PlatformAdvertiser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BleAdvertiser for PlatformAdvertiser {
    async fn start_advertising(
        &mut self,
        spec: &AdvertisementSpec,
        config: &BleRadioConfig,
    ) -> Result<(), BleRadioError> {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref mut advertiser) => advertiser.start_advertising(spec, config).await,
            Self::Fallback(ref mut advertiser) => advertiser.start_advertising(spec, config).await,
        }
    }

    async fn stop_advertising(&mut self) -> Result<(), BleRadioError> {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref mut advertiser) => advertiser.stop_advertising().await,
            Self::Fallback(ref mut advertiser) => advertiser.stop_advertising().await,
        }
    }

    fn is_advertising(&self) -> bool {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref advertiser) => advertiser.is_advertising(),
            Self::Fallback(ref advertiser) => advertiser.is_advertising(),
        }
    }
}
