//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Scan for nearby broadcasters for one window
    Scan {
        /// Scan window in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,
        /// Print peers as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Broadcast a name until interrupted
    Advertise {
        /// Name to broadcast
        name: String,
        /// Stop after this many seconds
        #[arg(short, long)]
        duration_secs: Option<u64>,
    },
    /// Print an example configuration file
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan() {
        let cli = Cli::parse_from(["pokebeacon", "-v", "scan", "--timeout-ms", "2500", "--json"]);
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Commands::Scan {
                timeout_ms: Some(2500),
                json: true
            }
        );
    }

    #[test]
    fn test_parse_advertise() {
        let cli = Cli::parse_from(["pokebeacon", "-c", "beacon.toml", "advertise", "Pikachu"]);
        assert_eq!(cli.config, Some(PathBuf::from("beacon.toml")));
        assert_eq!(
            cli.command,
            Commands::Advertise {
                name: "Pikachu".to_string(),
                duration_secs: None
            }
        );
    }

    #[test]
    fn test_advertise_requires_name() {
        assert!(Cli::try_parse_from(["pokebeacon", "advertise"]).is_err());
    }
}
