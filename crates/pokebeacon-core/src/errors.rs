//! Error types for the pokebeacon discovery protocol
//!
//! Each layer owns a small error enum; [`DiscoveryError`] unifies them at the
//! facade and attaches a stable [`ErrorCategory`] for presentation.

use core::fmt;

use crate::permission::Permission;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Payload codec errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Payload is empty")]
    EmptyPayload,
    #[error("Malformed payload: {reason}")]
    MalformedPayload { reason: String },
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}

/// Permission gate errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    #[error("Bluetooth permissions denied: {}", format_permissions(.denied))]
    PermissionDenied { denied: Vec<Permission> },
    #[error("Bluetooth adapter is powered off")]
    RadioDisabled,
    #[error("Permission subsystem unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Advertise session errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvertiseError {
    #[error("Broadcast failed: {reason}")]
    BroadcastFailed { reason: String },
    #[error("Invalid advertise payload: {0}")]
    Payload(#[from] DecodeError),
}

/// Scan session errors
///
/// Only the initial driver call is reported; per-event errors are absorbed by
/// the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("Failed to start scan: {reason}")]
    StartFailed { reason: String },
}

/// Errors surfaced by a [`RadioDriver`](crate::radio::RadioDriver) implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RadioError {
    #[error("Radio unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("Radio driver error: {reason}")]
    Driver { reason: String },
    #[error("Operation not supported on this platform: {operation}")]
    NotSupported { operation: String },
    /// The driver holds no broadcast under this handle
    #[error("No broadcast with handle {handle}")]
    UnknownBroadcast { handle: u64 },
}

/// Rejected [`DiscoveryConfig`](crate::DiscoveryConfig) values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid discovery configuration: {reason}")]
    Invalid { reason: String },
}

// ----------------------------------------------------------------------------
// Facade Error
// ----------------------------------------------------------------------------

/// Stable, user-presentable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InvalidPayload,
    PermissionDenied,
    RadioDisabled,
    BroadcastFailed,
    ScanFailed,
}

impl ErrorCategory {
    /// Label that stays fixed across releases
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::InvalidPayload => "invalid-payload",
            ErrorCategory::PermissionDenied => "permission-denied",
            ErrorCategory::RadioDisabled => "radio-disabled",
            ErrorCategory::BroadcastFailed => "broadcast-failed",
            ErrorCategory::ScanFailed => "scan-failed",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned by every [`DiscoveryFacade`](crate::DiscoveryFacade) operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error(transparent)]
    Advertise(#[from] AdvertiseError),
    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl DiscoveryError {
    /// Category used to label the error for the user
    pub fn category(&self) -> ErrorCategory {
        match self {
            DiscoveryError::Decode(_) => ErrorCategory::InvalidPayload,
            DiscoveryError::Permission(PermissionError::RadioDisabled) => {
                ErrorCategory::RadioDisabled
            }
            DiscoveryError::Permission(_) => ErrorCategory::PermissionDenied,
            DiscoveryError::Advertise(AdvertiseError::Payload(_)) => ErrorCategory::InvalidPayload,
            DiscoveryError::Advertise(_) => ErrorCategory::BroadcastFailed,
            DiscoveryError::Scan(_) => ErrorCategory::ScanFailed,
        }
    }
}

/// Result type for facade operations
pub type Result<T> = core::result::Result<T, DiscoveryError>;

fn format_permissions(permissions: &[Permission]) -> String {
    permissions
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_are_stable() {
        let err: DiscoveryError = DecodeError::EmptyPayload.into();
        assert_eq!(err.category().label(), "invalid-payload");

        let err: DiscoveryError = PermissionError::RadioDisabled.into();
        assert_eq!(err.category(), ErrorCategory::RadioDisabled);

        let err: DiscoveryError = PermissionError::Unavailable {
            reason: "prompt dismissed".to_string(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::PermissionDenied);

        let err: DiscoveryError = AdvertiseError::BroadcastFailed {
            reason: "busy".to_string(),
        }
        .into();
        assert_eq!(err.category().to_string(), "broadcast-failed");
    }

    #[test]
    fn test_denied_permissions_listed_in_message() {
        let err = PermissionError::PermissionDenied {
            denied: vec![Permission::BluetoothScan, Permission::BluetoothConnect],
        };
        assert_eq!(
            err.to_string(),
            "Bluetooth permissions denied: BLUETOOTH_SCAN, BLUETOOTH_CONNECT"
        );
    }
}
