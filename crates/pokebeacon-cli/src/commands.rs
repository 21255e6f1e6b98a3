//! Command handlers for the pokebeacon CLI

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use pokebeacon_core::{DiscoveryEvent, StopReason};

use crate::app::PokebeaconApp;
use crate::cli::Commands;
use crate::config::CliAppConfig;
use crate::error::Result;
use crate::output::Renderer;

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command, stopping early on Ctrl-C
    pub async fn execute<W: Write>(command: Commands, app: &mut PokebeaconApp, out: W) -> Result<()> {
        match command {
            Commands::Scan { .. } => {
                let json = app.config().cli.json;
                let timeout = app.config().discovery.scan_timeout();
                Self::handle_scan_command(app, timeout, Renderer::new(out, json), interrupted()).await
            }
            Commands::Advertise {
                name,
                duration_secs,
            } => {
                let duration = duration_secs.map(Duration::from_secs);
                Self::handle_advertise_command(app, &name, duration, Renderer::new(out, false), interrupted())
                    .await
            }
            Commands::Config => {
                let mut out = out;
                write!(out, "{}", CliAppConfig::example_config())?;
                Ok(())
            }
        }
    }

    /// Run one scan window and report peers as they appear
    pub async fn handle_scan_command<W: Write>(
        app: &mut PokebeaconApp,
        timeout: Duration,
        mut renderer: Renderer<W>,
        interrupt: impl Future<Output = ()>,
    ) -> Result<()> {
        let mut events = app.discovery().subscribe();
        app.discovery().start_scan_with_timeout(timeout).await?;
        renderer.status(&format!("Scanning for {}ms...", timeout.as_millis()))?;

        tokio::pin!(interrupt);
        let mut interrupted = false;

        loop {
            tokio::select! {
                _ = &mut interrupt, if !interrupted => {
                    info!("Interrupted, stopping scan");
                    interrupted = true;
                    app.discovery().stop_scan().await?;
                }
                event = events.recv() => match event {
                    Ok(DiscoveryEvent::PeerDiscovered(peer)) => renderer.peer_found(&peer)?,
                    Ok(DiscoveryEvent::ScanStopped { reason: StopReason::Timeout, peers: 0 }) => {
                        debug!("Window closed empty");
                    }
                    Ok(DiscoveryEvent::ScanStopped { reason, peers }) => {
                        debug!("Scan stopped ({:?}) with {} peer(s)", reason, peers);
                        break;
                    }
                    Ok(DiscoveryEvent::NoPeersFound) => break,
                    Ok(other) => debug!("Ignoring event {:?}", other),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} discovery event(s)", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        let peers = app.discovery().current_peers().await;
        renderer.summary(&peers)?;
        app.stop().await
    }

    /// Broadcast `name` until interrupted or `duration` elapses
    pub async fn handle_advertise_command<W: Write>(
        app: &mut PokebeaconApp,
        name: &str,
        duration: Option<Duration>,
        mut renderer: Renderer<W>,
        interrupt: impl Future<Output = ()>,
    ) -> Result<()> {
        app.discovery().start_advertise(name).await?;

        let local_name = app
            .discovery()
            .current_advertisement()
            .map(|payload| payload.local_name.clone())
            .unwrap_or_default();
        renderer.status(&format!("Advertising as '{}' (Ctrl-C to stop)", local_name))?;

        match duration {
            Some(duration) => {
                tokio::select! {
                    _ = interrupt => info!("Interrupted, stopping broadcast"),
                    _ = tokio::time::sleep(duration) => info!("Broadcast duration elapsed"),
                }
            }
            None => {
                interrupt.await;
                info!("Interrupted, stopping broadcast");
            }
        }

        app.discovery().stop_advertise().await?;
        renderer.status("Stopped advertising")?;
        app.stop().await
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokebeacon_core::testing::{MockPermissions, MockRadio, RadioCall};
    use pokebeacon_core::{DeviceId, RawAdvertisement};
    use std::sync::Arc;

    fn test_app(radio: &Arc<MockRadio>) -> PokebeaconApp {
        PokebeaconApp::with_collaborators(
            CliAppConfig::default(),
            radio.clone(),
            MockPermissions::granting_all(),
        )
    }

    fn never() -> impl Future<Output = ()> {
        std::future::pending()
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_reports_peers() {
        let radio = MockRadio::new();
        let mut app = test_app(&radio);
        let mut out = Vec::new();

        let emitter = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            radio.emit(
                RawAdvertisement::new(DeviceId::new("AA:BB:CC:DD:EE:01"))
                    .with_local_name("Pokemon:Bulbasaur")
                    .with_rssi(-58),
            );
        };
        let scan = CommandDispatcher::handle_scan_command(
            &mut app,
            Duration::from_millis(500),
            Renderer::new(&mut out, false),
            never(),
        );
        let (result, _) = tokio::join!(scan, emitter);
        result.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("+ Bulbasaur (AA:BB:CC:DD:EE:01, -58 dBm)"));
        assert!(out.contains("1 peer(s) discovered:"));
        assert_eq!(radio.calls().last(), Some(&RadioCall::Release));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_scan_says_so() {
        let radio = MockRadio::new();
        let mut app = test_app(&radio);
        let mut out = Vec::new();

        CommandDispatcher::handle_scan_command(
            &mut app,
            Duration::from_millis(300),
            Renderer::new(&mut out, false),
            never(),
        )
        .await
        .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.ends_with("no peers found\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_stops_scan_early() {
        let radio = MockRadio::new();
        let mut app = test_app(&radio);
        let mut out = Vec::new();

        let started = tokio::time::Instant::now();
        CommandDispatcher::handle_scan_command(
            &mut app,
            Duration::from_secs(5),
            Renderer::new(&mut out, true),
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await
        .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(radio.count(|call| *call == RadioCall::StopScan), 1);

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(r#""event":"summary""#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_advertise_for_duration() {
        let radio = MockRadio::new();
        let mut app = test_app(&radio);
        let mut out = Vec::new();

        CommandDispatcher::handle_advertise_command(
            &mut app,
            "Pikachu",
            Some(Duration::from_secs(3)),
            Renderer::new(&mut out, false),
            never(),
        )
        .await
        .unwrap();

        assert!(radio.active_broadcasts().is_empty());
        assert!(radio
            .calls()
            .contains(&RadioCall::StartAdvertise("Pokemon:Pikachu".to_string())));

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Advertising as 'Pokemon:Pikachu'"));
        assert!(out.contains("Stopped advertising"));
    }

    #[tokio::test]
    async fn test_advertise_rejects_blank_name() {
        let radio = MockRadio::new();
        let mut app = test_app(&radio);

        let err = CommandDispatcher::handle_advertise_command(
            &mut app,
            "  ",
            None,
            Renderer::new(Vec::new(), false),
            never(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.label(), "invalid-payload");
        assert!(radio.calls().is_empty());
    }
}
