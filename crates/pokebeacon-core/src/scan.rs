//! Incoming scan lifecycle
//!
//! A scan runs for a fixed window. While it runs, a background task drains the
//! driver's event channel, keeps protocol advertisements and drops everything
//! else. The task owns the window timer; `stop()` cancels it before touching
//! state, so a late timer or driver callback never revives a stopped session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::codec::PayloadCodec;
use crate::errors::ScanError;
use crate::events::{publish, DiscoveryEvent, EventSender, StopReason};
use crate::peer::PeerAdvertisement;
use crate::radio::{DeviceId, RadioSession, RawAdvertisement, ScanEvent, ScanEventReceiver, ScanFilter};

/// Default scan window
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_millis(5000);

/// Scan session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning,
    Stopped,
}

// ----------------------------------------------------------------------------
// Peer Table
// ----------------------------------------------------------------------------

/// Insertion-ordered peers keyed by device id; first sighting wins
#[derive(Debug, Default)]
struct PeerTable {
    index: HashMap<DeviceId, usize>,
    peers: Vec<PeerAdvertisement>,
}

impl PeerTable {
    /// Insert a new peer, or record a repeat sighting; true if new
    fn observe(&mut self, peer: PeerAdvertisement) -> bool {
        if self.touch(&peer.id) {
            return false;
        }
        self.index.insert(peer.id.clone(), self.peers.len());
        self.peers.push(peer);
        true
    }

    /// Record a repeat sighting; false if the device is unknown
    fn touch(&mut self, id: &DeviceId) -> bool {
        match self.index.get(id) {
            Some(&slot) => {
                self.peers[slot].touch();
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.peers.len()
    }

    fn clear(&mut self) {
        self.index.clear();
        self.peers.clear();
    }
}

// ----------------------------------------------------------------------------
// Shared State
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ScanShared {
    state: ScanState,
    /// Bumped on every start and stop; tasks act only on their own generation
    generation: u64,
    started_at: Option<Instant>,
    timeout: Duration,
    table: PeerTable,
}

impl ScanShared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.state == ScanState::Scanning
    }

    /// Scanning -> Stopped; returns the peer count if a transition happened
    fn halt(&mut self) -> Option<usize> {
        if self.state != ScanState::Scanning {
            return None;
        }
        self.state = ScanState::Stopped;
        self.generation += 1;
        Some(self.table.len())
    }
}

// ----------------------------------------------------------------------------
// Scan Session
// ----------------------------------------------------------------------------

/// Owns the incoming scan and the peers it found
pub struct ScanSession {
    radio: RadioSession,
    codec: PayloadCodec,
    services: Vec<Uuid>,
    events: EventSender,
    default_timeout: Duration,
    shared: Arc<RwLock<ScanShared>>,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ScanSession {
    pub fn new(
        radio: RadioSession,
        codec: PayloadCodec,
        services: Vec<Uuid>,
        events: EventSender,
    ) -> Self {
        Self {
            radio,
            codec,
            services,
            events,
            default_timeout: DEFAULT_SCAN_TIMEOUT,
            shared: Arc::new(RwLock::new(ScanShared::default())),
            cancel: None,
            task: None,
        }
    }

    /// Window used by [`start`](Self::start)
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub async fn state(&self) -> ScanState {
        self.shared.read().await.state
    }

    /// Window of the current (or last) session
    pub async fn timeout(&self) -> Duration {
        self.shared.read().await.timeout
    }

    pub async fn started_at(&self) -> Option<Instant> {
        self.shared.read().await.started_at
    }

    /// Peers in first-seen order; empty when idle
    pub async fn current_peers(&self) -> Vec<PeerAdvertisement> {
        let shared = self.shared.read().await;
        match shared.state {
            ScanState::Idle => Vec::new(),
            ScanState::Scanning | ScanState::Stopped => shared.table.peers.clone(),
        }
    }

    /// Start a scan with the default window
    pub async fn start(&mut self) -> Result<(), ScanError> {
        self.start_with_timeout(self.default_timeout).await
    }

    /// Start a scan that stops itself after `timeout`
    ///
    /// A scan that is already running is stopped first and its peers are
    /// discarded. Returns once the driver is scanning; the end of the window is
    /// reported later through [`DiscoveryEvent::ScanStopped`].
    pub async fn start_with_timeout(&mut self, timeout: Duration) -> Result<(), ScanError> {
        self.halt(StopReason::Restarted).await;

        let (generation, deadline) = {
            let mut shared = self.shared.write().await;
            shared.generation += 1;
            shared.table.clear();
            shared.state = ScanState::Scanning;
            shared.timeout = timeout;
            let started_at = Instant::now();
            shared.started_at = Some(started_at);
            (shared.generation, started_at + timeout)
        };

        let (sink, receiver) = mpsc::unbounded_channel();
        let filter = ScanFilter {
            name_prefix: Some(self.codec.prefix().to_string()),
            services: self.services.clone(),
        };
        let started = match self.radio.driver().await {
            Ok(driver) => driver.start_scan(filter, sink).await,
            Err(e) => Err(e),
        };
        if let Err(e) = started {
            let mut shared = self.shared.write().await;
            if shared.generation == generation {
                shared.state = ScanState::Idle;
                shared.generation += 1;
                shared.started_at = None;
            }
            warn!("Failed to start scan: {}", e);
            return Err(ScanError::StartFailed {
                reason: e.to_string(),
            });
        }

        let (cancel, cancelled) = oneshot::channel();
        let task = ScanTask {
            generation,
            radio: self.radio.clone(),
            codec: self.codec.clone(),
            events: self.events.clone(),
            shared: Arc::clone(&self.shared),
        };
        self.cancel = Some(cancel);
        self.task = Some(tokio::spawn(task.run(receiver, deadline, cancelled)));

        info!("Scanning for '{}' peers for {:?}", self.codec.prefix(), timeout);
        publish(&self.events, DiscoveryEvent::ScanStarted);
        Ok(())
    }

    /// Stop the scan before its window closes; a no-op unless scanning
    pub async fn stop(&mut self) {
        self.halt(StopReason::Manual).await;
    }

    /// Stop if needed and forget all peers
    pub async fn reset(&mut self) {
        self.halt(StopReason::Manual).await;
        let mut shared = self.shared.write().await;
        shared.table.clear();
        shared.state = ScanState::Idle;
        shared.started_at = None;
        shared.generation += 1;
    }

    async fn halt(&mut self, reason: StopReason) {
        // Cancel the window timer and event pump first; once the task has
        // exited nothing else can change the session.
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Scan task ended abnormally: {}", e);
            }
        }

        let Some(peers) = self.shared.write().await.halt() else {
            return;
        };

        stop_driver_scan(&self.radio).await;
        info!("Scan stopped ({:?}) with {} peer(s)", reason, peers);
        publish(&self.events, DiscoveryEvent::ScanStopped { reason, peers });
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn stop_driver_scan(radio: &RadioSession) {
    let result = match radio.driver().await {
        Ok(driver) => driver.stop_scan().await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        warn!("Failed to stop driver scan: {}", e);
    }
}

// ----------------------------------------------------------------------------
// Background Task
// ----------------------------------------------------------------------------

struct ScanTask {
    generation: u64,
    radio: RadioSession,
    codec: PayloadCodec,
    events: EventSender,
    shared: Arc<RwLock<ScanShared>>,
}

impl ScanTask {
    async fn run(
        self,
        mut receiver: ScanEventReceiver,
        deadline: Instant,
        mut cancelled: oneshot::Receiver<()>,
    ) {
        let window = tokio::time::sleep_until(deadline);
        tokio::pin!(window);
        let mut driver_open = true;

        loop {
            tokio::select! {
                biased;

                _ = &mut cancelled => {
                    debug!("Scan task cancelled");
                    return;
                }
                _ = &mut window => {
                    self.close_window().await;
                    return;
                }
                event = receiver.recv(), if driver_open => match event {
                    Some(ScanEvent::Advertisement(advertisement)) => {
                        self.observe(advertisement).await;
                    }
                    Some(ScanEvent::Error(e)) => {
                        warn!("Ignoring scan event error: {}", e);
                    }
                    None => {
                        debug!("Driver closed the scan channel; waiting for the window to close");
                        driver_open = false;
                    }
                },
            }
        }
    }

    async fn observe(&self, advertisement: RawAdvertisement) {
        let Some(name) = advertisement.local_name.as_deref() else {
            trace!("Dropping unnamed advertisement from {}", advertisement.id);
            return;
        };
        if !self.codec.matches(name) {
            trace!("Dropping foreign advertisement '{}'", name);
            return;
        }
        let payload = match self.codec.decode_advertisement(&advertisement) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("Dropping undecodable advertisement '{}': {}", name, e);
                return;
            }
        };

        let mut shared = self.shared.write().await;
        if !shared.is_current(self.generation) {
            debug!("Dropping stale advertisement from {}", advertisement.id);
            return;
        }

        if shared.table.touch(&advertisement.id) {
            trace!("Repeat sighting of {}", advertisement.id);
            return;
        }

        let first_seen_after = shared
            .started_at
            .map(|started_at| started_at.elapsed())
            .unwrap_or_default();
        let peer = PeerAdvertisement::new(
            advertisement.id.clone(),
            name.to_string(),
            payload,
            first_seen_after,
            advertisement.rssi,
        );
        if shared.table.observe(peer.clone()) {
            debug!("Discovered peer {} ('{}')", peer.id, peer.payload);
            publish(&self.events, DiscoveryEvent::PeerDiscovered(peer));
        }
    }

    async fn close_window(&self) {
        let peers = {
            let mut shared = self.shared.write().await;
            if shared.generation != self.generation {
                return;
            }
            match shared.halt() {
                Some(peers) => peers,
                None => return,
            }
        };

        stop_driver_scan(&self.radio).await;
        info!("Scan window closed with {} peer(s)", peers);
        publish(
            &self.events,
            DiscoveryEvent::ScanStopped {
                reason: StopReason::Timeout,
                peers,
            },
        );
        if peers == 0 {
            info!("No peers found");
            publish(&self.events, DiscoveryEvent::NoPeersFound);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: &str, payload: &str) -> PeerAdvertisement {
        PeerAdvertisement::new(
            DeviceId::new(id),
            format!("Pokemon:{}", payload),
            payload.to_string(),
            Duration::ZERO,
            None,
        )
    }

    #[test]
    fn test_peer_table_first_seen_wins() {
        let mut table = PeerTable::default();
        assert!(table.observe(peer("AA:01", "Bulbasaur")));
        assert!(!table.observe(peer("AA:01", "Ivysaur")));
        assert!(table.observe(peer("AA:02", "Charmander")));

        assert_eq!(table.len(), 2);
        assert_eq!(table.peers[0].payload, "Bulbasaur");
        assert_eq!(table.peers[0].sightings, 2);
        assert_eq!(table.peers[1].payload, "Charmander");
    }

    #[test]
    fn test_halt_only_from_scanning() {
        let mut shared = ScanShared::default();
        assert_eq!(shared.halt(), None);

        shared.state = ScanState::Scanning;
        shared.table.observe(peer("AA:01", "Bulbasaur"));
        let generation = shared.generation;
        assert_eq!(shared.halt(), Some(1));
        assert_eq!(shared.state, ScanState::Stopped);
        assert!(!shared.is_current(generation));
        assert_eq!(shared.halt(), None);
    }
}
