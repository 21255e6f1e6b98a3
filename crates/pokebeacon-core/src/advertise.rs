//! Outgoing advertisement lifecycle
//!
//! ```text
//! Idle --start--> Advertising --stop--> Idle
//! Advertising --start--> (implicit stop) --> Advertising
//! any --driver error--> Failed --start--> Advertising | Failed
//! ```
//!
//! At most one broadcast handle is held at a time. Replacing the payload always
//! stops the previous broadcast before starting the next one; if that stop
//! fails the replacement is abandoned and the old handle kept.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec::{EncodedPayload, PayloadCodec};
use crate::errors::{AdvertiseError, RadioError};
use crate::events::{publish, DiscoveryEvent, EventSender};
use crate::radio::{AdvertiseHandle, AdvertisementSpec, RadioSession};

/// Advertise session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdvertiseState {
    #[default]
    Idle,
    Advertising,
    Failed,
}

#[derive(Debug)]
struct ActiveBroadcast {
    handle: AdvertiseHandle,
    payload: EncodedPayload,
}

/// Owns the outgoing broadcast
pub struct AdvertiseSession {
    radio: RadioSession,
    codec: PayloadCodec,
    service_uuids: Vec<Uuid>,
    events: EventSender,
    state: AdvertiseState,
    active: Option<ActiveBroadcast>,
}

impl AdvertiseSession {
    pub fn new(
        radio: RadioSession,
        codec: PayloadCodec,
        service_uuids: Vec<Uuid>,
        events: EventSender,
    ) -> Self {
        Self {
            radio,
            codec,
            service_uuids,
            events,
            state: AdvertiseState::Idle,
            active: None,
        }
    }

    pub fn state(&self) -> AdvertiseState {
        self.state
    }

    /// Payload currently on air, if any
    pub fn current_payload(&self) -> Option<&EncodedPayload> {
        self.active.as_ref().map(|active| &active.payload)
    }

    /// Broadcast `payload_name`, replacing any broadcast already running
    pub async fn start(&mut self, payload_name: &str) -> Result<(), AdvertiseError> {
        let payload = self.codec.encode_advertisement(payload_name)?;

        if let Some(previous) = self.active.take() {
            if let Err(e) = self.stop_handle(previous.handle).await {
                // The previous broadcast may still be on air; never start a second one
                self.active = Some(previous);
                return Err(self.fail(e));
            }
            debug!("Stopped '{}' before replacing it", previous.payload.local_name);
            self.state = AdvertiseState::Idle;
        }

        let spec = AdvertisementSpec {
            local_name: payload.local_name.clone(),
            service_uuids: self.service_uuids.clone(),
            manufacturer_data: payload.manufacturer_data.clone(),
        };

        match self.broadcast(spec).await {
            Ok(handle) => {
                info!("Advertising as '{}'", payload.local_name);
                publish(
                    &self.events,
                    DiscoveryEvent::AdvertiseStarted {
                        local_name: payload.local_name.clone(),
                    },
                );
                self.active = Some(ActiveBroadcast { handle, payload });
                self.state = AdvertiseState::Advertising;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Stop the broadcast; succeeds without doing anything when idle
    pub async fn stop(&mut self) -> Result<(), AdvertiseError> {
        let Some(active) = self.active.take() else {
            if self.state == AdvertiseState::Failed {
                debug!("Clearing failed advertise session");
            }
            self.state = AdvertiseState::Idle;
            return Ok(());
        };

        match self.stop_handle(active.handle).await {
            Ok(()) => {
                info!("Stopped advertising '{}'", active.payload.local_name);
                self.state = AdvertiseState::Idle;
                publish(&self.events, DiscoveryEvent::AdvertiseStopped);
                Ok(())
            }
            Err(e) => {
                // The broadcast may still be live; keep the handle so the next
                // start stops it first.
                self.active = Some(active);
                Err(self.fail(e))
            }
        }
    }

    async fn broadcast(&self, spec: AdvertisementSpec) -> Result<AdvertiseHandle, RadioError> {
        let driver = self.radio.driver().await?;
        driver.start_advertise(spec).await
    }

    /// Stop `handle`, treating a broadcast the driver no longer knows as stopped
    async fn stop_handle(&self, handle: AdvertiseHandle) -> Result<(), RadioError> {
        let driver = self.radio.driver().await?;
        match driver.stop_advertise(handle).await {
            Err(RadioError::UnknownBroadcast { handle }) => {
                debug!("Broadcast {} already gone", handle);
                Ok(())
            }
            result => result,
        }
    }

    fn fail(&mut self, error: RadioError) -> AdvertiseError {
        let reason = error.to_string();
        warn!("Advertise session failed: {}", reason);
        self.state = AdvertiseState::Failed;
        publish(
            &self.events,
            DiscoveryEvent::AdvertiseFailed {
                reason: reason.clone(),
            },
        );
        AdvertiseError::BroadcastFailed { reason }
    }
}
