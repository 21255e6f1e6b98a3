//! Pokebeacon CLI configuration management
//!
//! Configuration is layered with figment, lowest priority first:
//! - Defaults
//! - `pokebeacon.toml` in the working directory
//! - `~/.pokebeacon/config.toml`
//! - Environment variables (`POKEBEACON_*`, sections split on `__`)
//! - An explicit `--config` file
//! - Command line flags

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use pokebeacon_ble::BleRadioConfig;
use pokebeacon_core::DiscoveryConfig;

const ENV_PREFIX: &str = "POKEBEACON_";
const LOCAL_CONFIG_FILE: &str = "pokebeacon.toml";

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the pokebeacon CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliAppConfig {
    /// Discovery protocol configuration
    pub discovery: DiscoveryConfig,

    /// BLE radio configuration
    pub ble: BleRadioConfig,

    /// CLI-specific configuration
    pub cli: CliConfig,
}

/// CLI-specific configuration options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Enable verbose logging output
    pub verbose: bool,

    /// Print scan results as JSON lines
    pub json: bool,
}

/// Values given on the command line; `None` leaves lower layers untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub scan_timeout_ms: Option<u64>,
    pub json: Option<bool>,
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl CliAppConfig {
    /// Load configuration from every layer
    pub fn load(overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(LOCAL_CONFIG_FILE))
            .merge(Toml::file(Self::default_config_path()?))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(path) = &overrides.config_file {
            if !path.exists() {
                return Err(ConfigError::Loading(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        if let Some(verbose) = overrides.verbose {
            figment = figment.merge(("cli.verbose", verbose));
        }
        if let Some(timeout) = overrides.scan_timeout_ms {
            figment = figment.merge(("discovery.scan_timeout_ms", timeout));
        }
        if let Some(json) = overrides.json {
            figment = figment.merge(("cli.json", json));
        }

        Self::extract(figment)
    }

    /// Load configuration from a single file on top of the defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()));

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: CliAppConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    fn default_config_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| {
                ConfigError::Environment("No HOME or USERPROFILE environment variable".to_string())
            })?;

        Ok(PathBuf::from(home).join(".pokebeacon").join("config.toml"))
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.discovery
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    /// Create example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| "# Failed to generate example config".to_string())
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment error: {0}")]
    Environment(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
