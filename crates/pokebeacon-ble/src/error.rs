//! Error types for the BLE radio driver

use pokebeacon_core::{PermissionError, RadioError};
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors specific to the BLE radio
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BleRadioError {
    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("BLE adapter not initialized")]
    AdapterNotInitialized,

    #[error("Failed to create BLE manager: {0}")]
    ManagerFailed(String),

    #[error("Failed to start BLE scan: {0}")]
    ScanFailed(String),

    #[error("Failed to get BLE events: {0}")]
    EventStreamFailed(String),

    #[error("Failed to read peripheral properties: {0}")]
    PropertiesFailed(String),

    #[error("Failed to start advertising: {0}")]
    AdvertiseFailed(String),

    #[error("BLE advertising not supported on this platform")]
    AdvertisingNotSupported,

    #[error("No broadcast with handle {handle}")]
    UnknownBroadcast { handle: u64 },

    #[error("BlueZ error: {0}")]
    BlueZ(String),
}

impl From<BleRadioError> for RadioError {
    fn from(err: BleRadioError) -> Self {
        match err {
            BleRadioError::AdapterNotAvailable
            | BleRadioError::AdapterNotInitialized
            | BleRadioError::ManagerFailed(_) => RadioError::Unavailable {
                reason: err.to_string(),
            },
            BleRadioError::AdvertisingNotSupported => RadioError::NotSupported {
                operation: "advertise".to_string(),
            },
            BleRadioError::UnknownBroadcast { handle } => RadioError::UnknownBroadcast { handle },
            _ => RadioError::Driver {
                reason: err.to_string(),
            },
        }
    }
}

impl From<BleRadioError> for PermissionError {
    fn from(err: BleRadioError) -> Self {
        match err {
            BleRadioError::AdapterNotAvailable => PermissionError::RadioDisabled,
            _ => PermissionError::Unavailable {
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_errors_map_to_unavailable() {
        let err: RadioError = BleRadioError::AdapterNotAvailable.into();
        assert_eq!(
            err,
            RadioError::Unavailable {
                reason: "BLE adapter not available".to_string()
            }
        );
    }

    #[test]
    fn test_unsupported_advertising_maps_to_not_supported() {
        let err: RadioError = BleRadioError::AdvertisingNotSupported.into();
        assert!(matches!(err, RadioError::NotSupported { operation } if operation == "advertise"));
    }

    #[test]
    fn test_driver_failures_keep_message() {
        let err: RadioError = BleRadioError::ScanFailed("org.bluez.Error.InProgress".into()).into();
        assert_eq!(
            err.to_string(),
            "Radio driver error: Failed to start BLE scan: org.bluez.Error.InProgress"
        );
    }

    #[test]
    fn test_missing_adapter_reads_as_radio_disabled() {
        let err: PermissionError = BleRadioError::AdapterNotAvailable.into();
        assert_eq!(err, PermissionError::RadioDisabled);

        let err: PermissionError = BleRadioError::BlueZ("no session".into()).into();
        assert!(matches!(err, PermissionError::Unavailable { .. }));
    }

    #[test]
    fn test_unknown_broadcast_keeps_its_own_variant() {
        let err: RadioError = BleRadioError::UnknownBroadcast { handle: 3 }.into();
        assert_eq!(err, RadioError::UnknownBroadcast { handle: 3 });
    }
}
