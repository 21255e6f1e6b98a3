//! Single entry point driven by the presentation layer
//!
//! The facade owns one scan session and one advertise session, which may run
//! at the same time. Before each radio operation it runs the permission gate
//! so that a missing grant surfaces as a [`PermissionError`] instead of a
//! driver-specific failure later.
//!
//! [`PermissionError`]: crate::errors::PermissionError

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::advertise::{AdvertiseSession, AdvertiseState};
use crate::codec::EncodedPayload;
use crate::config::DiscoveryConfig;
use crate::errors::Result;
use crate::events::{event_channel, EventReceiver, EventSender};
use crate::peer::PeerAdvertisement;
use crate::permission::{PermissionGate, PermissionProvider, RadioRole};
use crate::radio::{RadioDriver, RadioSession};
use crate::scan::{ScanSession, ScanState};

/// Discovery and advertising over BLE advertisement frames
pub struct DiscoveryFacade {
    config: DiscoveryConfig,
    gate: PermissionGate,
    radio: RadioSession,
    scan: ScanSession,
    advertise: AdvertiseSession,
    events: EventSender,
}

impl DiscoveryFacade {
    /// Create a facade with its own permission gate
    pub fn new(
        config: DiscoveryConfig,
        radio: Arc<dyn RadioDriver>,
        permissions: Arc<dyn PermissionProvider>,
    ) -> Self {
        let gate = PermissionGate::new(permissions, config.platform);
        Self::with_gate(config, radio, gate)
    }

    /// Create a facade sharing an existing permission gate
    pub fn with_gate(
        config: DiscoveryConfig,
        radio: Arc<dyn RadioDriver>,
        gate: PermissionGate,
    ) -> Self {
        let events = event_channel();
        let radio = RadioSession::new(radio);
        let codec = config.codec();
        let services = vec![config.service_uuid];

        let scan = ScanSession::new(radio.clone(), codec.clone(), services.clone(), events.clone())
            .with_default_timeout(config.scan_timeout());
        let advertise = AdvertiseSession::new(radio.clone(), codec, services, events.clone());

        Self {
            config,
            gate,
            radio,
            scan,
            advertise,
            events,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn permission_gate(&self) -> &PermissionGate {
        &self.gate
    }

    /// Receive scan and advertise status transitions
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------------

    /// Start a scan with the configured window, discarding earlier peers
    pub async fn start_scan(&mut self) -> Result<()> {
        self.start_scan_with_timeout(self.config.scan_timeout()).await
    }

    /// Start a scan with an explicit window
    pub async fn start_scan_with_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.gate.ensure_ready(RadioRole::Scan).await?;
        self.scan.start_with_timeout(timeout).await?;
        Ok(())
    }

    /// Stop the scan early; peers found so far stay readable
    pub async fn stop_scan(&mut self) -> Result<()> {
        self.scan.stop().await;
        Ok(())
    }

    /// Peers of the current or last scan, in first-seen order
    pub async fn current_peers(&self) -> Vec<PeerAdvertisement> {
        self.scan.current_peers().await
    }

    pub async fn scan_state(&self) -> ScanState {
        self.scan.state().await
    }

    // ------------------------------------------------------------------------
    // Advertising
    // ------------------------------------------------------------------------

    /// Broadcast `name`, replacing any running broadcast
    ///
    /// The name is validated before any permission prompt is shown.
    pub async fn start_advertise(&mut self, name: &str) -> Result<()> {
        self.config.codec().encode(name)?;
        self.gate.ensure_ready(RadioRole::Advertise).await?;
        self.advertise.start(name).await?;
        Ok(())
    }

    /// Stop broadcasting; succeeds when nothing is on air
    pub async fn stop_advertise(&mut self) -> Result<()> {
        self.advertise.stop().await?;
        Ok(())
    }

    pub fn advertise_state(&self) -> AdvertiseState {
        self.advertise.state()
    }

    /// Payload currently on air
    pub fn current_advertisement(&self) -> Option<&EncodedPayload> {
        self.advertise.current_payload()
    }

    // ------------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------------

    /// Stop both roles and release the radio
    pub async fn shutdown(&mut self) -> Result<()> {
        self.scan.stop().await;
        let stopped = self.advertise.stop().await;
        if let Err(e) = self.radio.release().await {
            warn!("Radio release failed during shutdown: {}", e);
        }
        info!("Discovery shut down");
        stopped?;
        Ok(())
    }
}
