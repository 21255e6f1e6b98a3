//! Pokebeacon CLI - main entry point

use clap::Parser;
use tracing::{error, info};

use pokebeacon_cli::{
    app::PokebeaconApp,
    cli::{Cli, Commands},
    commands::CommandDispatcher,
    config::{CliAppConfig, CliOverrides},
    error::Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match CliAppConfig::load(&overrides(&cli)) {
        Ok(config) => config,
        Err(e) => {
            setup_logging(cli.verbose);
            error!("Failed to load configuration: {}", e);
            eprintln!("error[config]: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    setup_logging(config.cli.verbose);

    // Create application
    let mut app = PokebeaconApp::new(config);

    // Execute the command
    if let Err(e) = CommandDispatcher::execute(cli.command, &mut app, std::io::stdout()).await {
        error!("Command execution failed: {}", e);
        eprintln!("error[{}]: {}", e.label(), e);
        if let Err(e) = app.stop().await {
            error!("Shutdown failed: {}", e);
        }
        std::process::exit(1);
    }

    info!("Pokebeacon exited successfully");
    Ok(())
}

/// Collect command line values that override configuration
fn overrides(cli: &Cli) -> CliOverrides {
    let mut overrides = CliOverrides {
        config_file: cli.config.clone(),
        verbose: cli.verbose.then_some(true),
        ..Default::default()
    };

    if let Commands::Scan { timeout_ms, json } = &cli.command {
        overrides.scan_timeout_ms = *timeout_ms;
        overrides.json = json.then_some(true);
    }
    overrides
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
