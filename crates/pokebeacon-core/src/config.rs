//! Discovery configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::{PayloadCodec, MAX_LOCAL_NAME_LEN, PROTOCOL_PREFIX, TEST_COMPANY_ID};
use crate::errors::ConfigError;
use crate::permission::PlatformProfile;

/// Service UUID broadcast next to the local name
pub const DEFAULT_SERVICE_UUID: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789ABCDEF0);

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the discovery facade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Scan window in milliseconds
    pub scan_timeout_ms: u64,
    /// Local-name prefix identifying protocol advertisements
    pub name_prefix: String,
    /// Service UUID included in outgoing advertisements
    pub service_uuid: Uuid,
    /// Company id for the manufacturer-data channel; `None` disables it
    pub manufacturer_company_id: Option<u16>,
    /// Local-name length above which drivers are expected to truncate
    pub max_local_name_len: usize,
    /// Host permission model
    pub platform: PlatformProfile,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            scan_timeout_ms: 5000,
            name_prefix: PROTOCOL_PREFIX.to_string(),
            service_uuid: DEFAULT_SERVICE_UUID,
            manufacturer_company_id: Some(TEST_COMPANY_ID),
            max_local_name_len: MAX_LOCAL_NAME_LEN,
            platform: PlatformProfile::desktop(),
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan window
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the local-name prefix
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Set or disable the manufacturer-data channel
    pub fn with_manufacturer_company_id(mut self, company_id: Option<u16>) -> Self {
        self.manufacturer_company_id = company_id;
        self
    }

    /// Set the host permission model
    pub fn with_platform(mut self, platform: PlatformProfile) -> Self {
        self.platform = platform;
        self
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    /// Codec matching this configuration
    pub fn codec(&self) -> PayloadCodec {
        PayloadCodec::new(self.name_prefix.clone())
            .with_company_id(self.manufacturer_company_id)
            .with_max_local_name_len(self.max_local_name_len)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_timeout_ms == 0 {
            return Err(invalid("scan timeout must be greater than 0"));
        }
        if self.name_prefix.is_empty() {
            return Err(invalid("name prefix must not be empty"));
        }
        if !self.name_prefix.is_ascii() {
            return Err(invalid("name prefix must be ASCII"));
        }
        if self.name_prefix.len() >= self.max_local_name_len {
            return Err(invalid(format!(
                "name prefix '{}' leaves no room for a payload within {} bytes",
                self.name_prefix, self.max_local_name_len
            )));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DiscoveryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.service_uuid.to_string(),
            "12345678-1234-5678-1234-56789abcdef0"
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = DiscoveryConfig::new().with_scan_timeout(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = DiscoveryConfig::new().with_name_prefix("");
        assert!(config.validate().is_err());

        let config = DiscoveryConfig::new().with_name_prefix("Pokémon:");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_codec_follows_config() {
        let config = DiscoveryConfig::new()
            .with_name_prefix("Mon:")
            .with_manufacturer_company_id(None);
        let codec = config.codec();
        assert_eq!(codec.prefix(), "Mon:");
        assert_eq!(codec.company_id(), None);
    }
}
