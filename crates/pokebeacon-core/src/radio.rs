//! Radio driver collaborator and the explicitly owned radio session
//!
//! The BLE radio is an external collaborator. Drivers implement
//! [`RadioDriver`]; the core only ever talks to one through a [`RadioSession`],
//! which acquires the driver on first use and releases it on teardown.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec::ManufacturerData;
use crate::errors::RadioError;

// ----------------------------------------------------------------------------
// Wire Types
// ----------------------------------------------------------------------------

/// Opaque radio address, stable per physical device for one scan session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One advertisement as reported by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAdvertisement {
    pub id: DeviceId,
    pub local_name: Option<String>,
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    pub rssi: Option<i16>,
}

impl RawAdvertisement {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            local_name: None,
            manufacturer_data: HashMap::new(),
            rssi: None,
        }
    }

    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    pub fn with_manufacturer_data(mut self, company_id: u16, data: Vec<u8>) -> Self {
        self.manufacturer_data.insert(company_id, data);
        self
    }

    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }
}

/// Event pushed by the driver while a scan is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Advertisement(RawAdvertisement),
    /// Non-fatal driver error; logged and dropped by the session
    Error(String),
}

/// Channel the driver pushes scan events into
pub type ScanEventSender = mpsc::UnboundedSender<ScanEvent>;
pub type ScanEventReceiver = mpsc::UnboundedReceiver<ScanEvent>;

/// Hint passed to the driver when starting a scan
///
/// Drivers may pre-filter with it; the session filters again regardless.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanFilter {
    pub name_prefix: Option<String>,
    pub services: Vec<Uuid>,
}

/// What to put on air for one broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementSpec {
    pub local_name: String,
    pub service_uuids: Vec<Uuid>,
    pub manufacturer_data: Option<ManufacturerData>,
}

/// Driver-issued handle for an active broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdvertiseHandle(pub u64);

// ----------------------------------------------------------------------------
// Driver Trait
// ----------------------------------------------------------------------------

/// Platform BLE radio primitives
#[async_trait::async_trait]
pub trait RadioDriver: Send + Sync {
    /// Bring up the adapter; called once before the first radio operation
    async fn acquire(&self) -> Result<(), RadioError>;

    /// Tear down whatever `acquire` set up
    async fn release(&self) -> Result<(), RadioError>;

    /// Begin scanning and push every advertisement seen into `sink`
    async fn start_scan(&self, filter: ScanFilter, sink: ScanEventSender) -> Result<(), RadioError>;

    /// Stop the running scan; a no-op if none is running
    async fn stop_scan(&self) -> Result<(), RadioError>;

    /// Start broadcasting `spec`
    async fn start_advertise(&self, spec: AdvertisementSpec) -> Result<AdvertiseHandle, RadioError>;

    /// Stop the broadcast identified by `handle`
    async fn stop_advertise(&self, handle: AdvertiseHandle) -> Result<(), RadioError>;
}

// ----------------------------------------------------------------------------
// Radio Session
// ----------------------------------------------------------------------------

/// Scoped ownership of one radio driver
///
/// Cloning shares the same driver and acquisition state; the scan and
/// advertise sessions each hold a clone.
#[derive(Clone)]
pub struct RadioSession {
    driver: Arc<dyn RadioDriver>,
    acquired: Arc<Mutex<bool>>,
}

impl fmt::Debug for RadioSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadioSession").finish_non_exhaustive()
    }
}

impl RadioSession {
    pub fn new(driver: Arc<dyn RadioDriver>) -> Self {
        Self {
            driver,
            acquired: Arc::new(Mutex::new(false)),
        }
    }

    /// Acquire the driver if this is the first use, then hand it out
    pub async fn driver(&self) -> Result<&dyn RadioDriver, RadioError> {
        let mut acquired = self.acquired.lock().await;
        if !*acquired {
            self.driver.acquire().await?;
            *acquired = true;
            info!("Radio session acquired");
        }
        Ok(self.driver.as_ref())
    }

    pub async fn is_acquired(&self) -> bool {
        *self.acquired.lock().await
    }

    /// Release the driver; the next operation re-acquires it
    pub async fn release(&self) -> Result<(), RadioError> {
        let mut acquired = self.acquired.lock().await;
        if !*acquired {
            debug!("Radio session release requested but never acquired");
            return Ok(());
        }
        *acquired = false;
        if let Err(e) = self.driver.release().await {
            warn!("Radio driver release failed: {}", e);
            return Err(e);
        }
        info!("Radio session released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockRadio, RadioCall};

    #[tokio::test]
    async fn test_session_acquires_once_and_releases() {
        let radio = MockRadio::new();
        let session = RadioSession::new(radio.clone());
        assert!(!session.is_acquired().await);

        session.driver().await.unwrap();
        session.clone().driver().await.unwrap();
        assert!(session.is_acquired().await);
        assert_eq!(radio.count(|call| *call == RadioCall::Acquire), 1);

        session.release().await.unwrap();
        assert!(!session.is_acquired().await);
        assert_eq!(radio.calls().last(), Some(&RadioCall::Release));

        // Releasing again never reaches the driver
        session.release().await.unwrap();
        assert_eq!(radio.count(|call| *call == RadioCall::Release), 1);
    }
}
