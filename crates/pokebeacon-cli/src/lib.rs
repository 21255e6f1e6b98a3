//! Pokebeacon CLI library
//!
//! Command-line scanner and broadcaster for the pokebeacon discovery
//! protocol, built on `pokebeacon-core` and the host BLE radio.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use app::PokebeaconApp;
pub use cli::{Cli, Commands};
pub use config::{CliAppConfig, CliOverrides, ConfigError};
pub use error::{CliError, Result};
pub use output::{PeerReport, Renderer};
