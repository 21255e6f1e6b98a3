//! Discovered peer records

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::radio::DeviceId;
use crate::types::Timestamp;

/// A protocol peer seen during one scan session
///
/// Identity is the device id. Repeat sightings only touch the recency fields
/// (`last_seen_at`, `sightings`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAdvertisement {
    /// Radio address of the advertiser
    pub id: DeviceId,
    /// Local name exactly as advertised, prefix included
    pub raw_name: String,
    /// Decoded application payload
    pub payload: String,
    /// Wall-clock time of the first sighting
    pub first_seen_at: Timestamp,
    /// Offset of the first sighting from the start of the scan window
    pub first_seen_after: Duration,
    /// Signal strength of the first sighting, if the driver reported one
    pub rssi: Option<i16>,
    /// Wall-clock time of the latest sighting
    pub last_seen_at: Timestamp,
    /// Number of matching advertisements received from this device
    pub sightings: u32,
}

impl PeerAdvertisement {
    pub fn new(
        id: DeviceId,
        raw_name: String,
        payload: String,
        first_seen_after: Duration,
        rssi: Option<i16>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            raw_name,
            payload,
            first_seen_at: now,
            first_seen_after,
            rssi,
            last_seen_at: now,
            sightings: 1,
        }
    }

    /// Record another sighting of the same device
    pub fn touch(&mut self) {
        self.last_seen_at = Timestamp::now();
        self.sightings = self.sightings.saturating_add(1);
    }
}
