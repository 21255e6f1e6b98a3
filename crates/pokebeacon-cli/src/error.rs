//! Error handling for the pokebeacon CLI

use thiserror::Error;

use pokebeacon_core::DiscoveryError;

use crate::config::ConfigError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    /// Short label printed in front of the message
    pub fn label(&self) -> &'static str {
        match self {
            CliError::Discovery(e) => e.category().label(),
            CliError::Config(_) => "config",
            CliError::Io(_) | CliError::Serialization(_) => "io",
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
