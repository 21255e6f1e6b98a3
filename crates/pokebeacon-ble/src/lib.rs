//! Bluetooth Low Energy radio driver for pokebeacon
//!
//! This crate implements the `RadioDriver` and `PermissionProvider`
//! collaborators from `pokebeacon-core` on top of the host Bluetooth stack.
//!
//! ## Architecture
//!
//! - [`config`] - Radio configuration and settings
//! - [`error`] - Error types specific to the BLE radio
//! - [`central`] - Advertisement scanning via btleplug
//! - [`advertising`] - Platform-specific broadcasting
//! - [`driver`] - The `RadioDriver` implementation
//! - [`permissions`] - Desktop permission and adapter checks
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pokebeacon_ble::{BleRadio, BleRadioConfig, DesktopPermissions};
//! use pokebeacon_core::{DiscoveryConfig, DiscoveryFacade};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BleRadioConfig::new().with_adapter_index(0);
//! let mut discovery = DiscoveryFacade::new(
//!     DiscoveryConfig::default(),
//!     Arc::new(BleRadio::new(config.clone())),
//!     Arc::new(DesktopPermissions::from_config(&config)),
//! );
//!
//! discovery.start_scan().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Support
//!
//! ### Advertising Support
//! - **Linux**: via `bluer` with BlueZ
//! - **Other platforms**: scanning only; broadcasts fail with a not-supported error
//!
//! ### Discovery Support
//! Every platform btleplug supports.

mod adapter;
pub mod advertising;
pub mod central;
pub mod config;
pub mod driver;
pub mod error;
pub mod permissions;

// Public API exports
pub use advertising::{BleAdvertiser, PlatformAdvertiser};
pub use central::BleCentral;
pub use config::BleRadioConfig;
pub use driver::BleRadio;
pub use error::BleRadioError;
pub use permissions::DesktopPermissions;
