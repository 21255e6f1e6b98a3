//! Status events delivered to the presentation layer

use tokio::sync::broadcast;

use crate::peer::PeerAdvertisement;

/// Default capacity of the event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Why a scan session left the Scanning state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The scan window elapsed
    Timeout,
    /// `stop()` was called
    Manual,
    /// A new scan replaced this one
    Restarted,
}

/// Scan and advertise status transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    ScanStarted,
    PeerDiscovered(PeerAdvertisement),
    ScanStopped { reason: StopReason, peers: usize },
    /// Informational: a scan window closed without finding anyone
    NoPeersFound,
    AdvertiseStarted { local_name: String },
    AdvertiseStopped,
    AdvertiseFailed { reason: String },
}

pub type EventSender = broadcast::Sender<DiscoveryEvent>;
pub type EventReceiver = broadcast::Receiver<DiscoveryEvent>;

/// Create the event channel shared by both sessions
pub fn event_channel() -> EventSender {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// Publish an event; having no subscribers is not an error
pub(crate) fn publish(events: &EventSender, event: DiscoveryEvent) {
    let _ = events.send(event);
}
