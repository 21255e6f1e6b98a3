//! BLE radio configuration

use std::time::Duration;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the BLE radio driver
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BleRadioConfig {
    /// Index of the adapter to use when several are present
    pub adapter_index: usize,
    /// Pass the service UUID filter down to the OS scanner
    ///
    /// Off by default: a full-length name plus a 128-bit UUID and
    /// manufacturer data rarely fit in one legacy advertisement, so peers may
    /// not carry the UUID at all.
    pub filter_services: bool,
    /// Power the adapter on when the readiness check finds it off
    pub power_on_adapter: bool,
    /// Requested advertising interval; the stack default when unset
    pub advertise_interval: Option<Duration>,
}

impl Default for BleRadioConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            filter_services: false,
            power_on_adapter: false,
            advertise_interval: None,
        }
    }
}

impl BleRadioConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the adapter by index
    pub fn with_adapter_index(mut self, index: usize) -> Self {
        self.adapter_index = index;
        self
    }

    /// Enable or disable OS-level service filtering
    pub fn with_filter_services(mut self, enabled: bool) -> Self {
        self.filter_services = enabled;
        self
    }

    /// Enable or disable powering on the adapter
    pub fn with_power_on_adapter(mut self, enabled: bool) -> Self {
        self.power_on_adapter = enabled;
        self
    }

    /// Set the advertising interval
    pub fn with_advertise_interval(mut self, interval: Duration) -> Self {
        self.advertise_interval = Some(interval);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = BleRadioConfig::new()
            .with_adapter_index(1)
            .with_filter_services(true)
            .with_advertise_interval(Duration::from_millis(100));

        assert_eq!(config.adapter_index, 1);
        assert!(config.filter_services);
        assert!(!config.power_on_adapter);
        assert_eq!(config.advertise_interval, Some(Duration::from_millis(100)));
    }
}
