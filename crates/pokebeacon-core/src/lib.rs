//! Proximity discovery and payload exchange inside BLE advertisement frames
//!
//! One side (the broadcaster) puts a short payload into its advertisement's
//! local name, `Pokemon:<payload>`, and optionally repeats it in manufacturer
//! data. The other side (the observer) scans for a fixed window, keeps only
//! advertisements carrying the prefix, and collects one peer per device.
//! Nothing ever connects; the exchange is one-way and bounded by what fits in
//! an advertisement.
//!
//! ## Architecture
//!
//! - [`codec`] - payload encoding into local name and manufacturer data
//! - [`permission`] - runtime permission and adapter checks
//! - [`radio`] - the driver collaborator trait and the owned radio session
//! - [`advertise`] - outgoing broadcast state machine
//! - [`scan`] - scan window, filtering and deduplication
//! - [`facade`] - the entry point used by the presentation layer
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pokebeacon_core::testing::{MockPermissions, MockRadio};
//! use pokebeacon_core::{DiscoveryConfig, DiscoveryFacade};
//!
//! # async fn example() -> Result<(), pokebeacon_core::DiscoveryError> {
//! let mut discovery = DiscoveryFacade::new(
//!     DiscoveryConfig::default(),
//!     MockRadio::new(),
//!     MockPermissions::granting_all(),
//! );
//!
//! discovery.start_advertise("Pikachu").await?;
//! discovery.start_scan().await?;
//! # Ok(())
//! # }
//! ```

pub mod advertise;
pub mod codec;
pub mod config;
pub mod errors;
pub mod events;
pub mod facade;
pub mod peer;
pub mod permission;
pub mod radio;
pub mod scan;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use advertise::{AdvertiseSession, AdvertiseState};
pub use codec::{EncodedPayload, ManufacturerData, PayloadCodec, PROTOCOL_PREFIX};
pub use config::DiscoveryConfig;
pub use errors::{
    AdvertiseError, ConfigError, DecodeError, DiscoveryError, ErrorCategory, PermissionError,
    RadioError, Result, ScanError,
};
pub use events::{DiscoveryEvent, EventReceiver, StopReason};
pub use facade::DiscoveryFacade;
pub use peer::PeerAdvertisement;
pub use permission::{
    Grant, Permission, PermissionGate, PermissionProvider, PermissionState, PlatformProfile,
    RadioRole,
};
pub use radio::{
    AdvertiseHandle, AdvertisementSpec, DeviceId, RadioDriver, RadioSession, RawAdvertisement,
    ScanEvent, ScanEventSender, ScanFilter,
};
pub use scan::{ScanSession, ScanState};
pub use types::Timestamp;
