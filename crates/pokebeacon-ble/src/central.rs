//! Advertisement scanning in BLE central mode using btleplug

use std::pin::Pin;

use btleplug::api::{
    BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter as BtleScanFilter,
};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::stream::{Stream, StreamExt};
use pokebeacon_core::{DeviceId, RawAdvertisement, ScanEvent, ScanEventSender, ScanFilter};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::adapter::select_adapter;
use crate::config::BleRadioConfig;
use crate::error::BleRadioError;

type CentralEvents = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

// ----------------------------------------------------------------------------
// Central Implementation
// ----------------------------------------------------------------------------

/// Scans for advertisements and forwards them to the discovery core
pub struct BleCentral {
    config: BleRadioConfig,
    adapter: RwLock<Option<Adapter>>,
    scan_task: Mutex<Option<JoinHandle<()>>>,
}

impl BleCentral {
    pub fn new(config: BleRadioConfig) -> Self {
        Self {
            config,
            adapter: RwLock::new(None),
            scan_task: Mutex::new(None),
        }
    }

    /// Initialize the BLE adapter
    pub async fn initialize(&self) -> Result<(), BleRadioError> {
        let mut slot = self.adapter.write().await;
        if slot.is_some() {
            return Ok(());
        }

        let manager = Manager::new()
            .await
            .map_err(|e| BleRadioError::ManagerFailed(e.to_string()))?;

        let adapters = manager
            .adapters()
            .await
            .map_err(|e| BleRadioError::ManagerFailed(format!("Failed to get adapters: {}", e)))?;

        let mut named = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let info = adapter
                .adapter_info()
                .await
                .map_err(|e| BleRadioError::ManagerFailed(format!("Failed to read adapter info: {}", e)))?;
            named.push((info, adapter));
        }
        let (info, adapter) = select_adapter(named, self.config.adapter_index)?;

        *slot = Some(adapter);
        info!("BLE adapter {} initialized", info);
        Ok(())
    }

    /// Whether an adapter is held
    pub async fn is_initialized(&self) -> bool {
        self.adapter.read().await.is_some()
    }

    /// Start scanning and forward every advertisement into `sink`
    pub async fn start_scan(
        &self,
        filter: ScanFilter,
        sink: ScanEventSender,
    ) -> Result<(), BleRadioError> {
        let adapter = self
            .adapter
            .read()
            .await
            .clone()
            .ok_or(BleRadioError::AdapterNotInitialized)?;

        self.abort_forwarder().await;

        let events = adapter
            .events()
            .await
            .map_err(|e| BleRadioError::EventStreamFailed(e.to_string()))?;

        let services = if self.config.filter_services {
            filter.services.clone()
        } else {
            Vec::new()
        };

        adapter
            .start_scan(BtleScanFilter { services })
            .await
            .map_err(|e| BleRadioError::ScanFailed(e.to_string()))?;

        let forwarder = tokio::spawn(forward_events(adapter, events, filter.name_prefix, sink));
        *self.scan_task.lock().await = Some(forwarder);

        info!("Started BLE scanning");
        Ok(())
    }

    /// Stop scanning; a no-op if no scan is running
    pub async fn stop_scan(&self) -> Result<(), BleRadioError> {
        if !self.abort_forwarder().await {
            return Ok(());
        }

        if let Some(adapter) = self.adapter.read().await.as_ref() {
            adapter
                .stop_scan()
                .await
                .map_err(|e| BleRadioError::ScanFailed(format!("Failed to stop scan: {}", e)))?;
        }
        info!("Stopped BLE scanning");
        Ok(())
    }

    /// Stop scanning and drop the adapter
    pub async fn release(&self) -> Result<(), BleRadioError> {
        let stopped = self.stop_scan().await;
        *self.adapter.write().await = None;
        debug!("BLE adapter released");
        stopped
    }

    async fn abort_forwarder(&self) -> bool {
        match self.scan_task.lock().await.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for BleCentral {
    fn drop(&mut self) {
        if let Some(task) = self.scan_task.get_mut().take() {
            task.abort();
        }
    }
}

// ----------------------------------------------------------------------------
// Event Forwarding
// ----------------------------------------------------------------------------

async fn forward_events(
    adapter: Adapter,
    mut events: CentralEvents,
    name_prefix: Option<String>,
    sink: ScanEventSender,
) {
    while let Some(event) = events.next().await {
        let id = match event {
            CentralEvent::DeviceDiscovered(id)
            | CentralEvent::DeviceUpdated(id)
            | CentralEvent::ManufacturerDataAdvertisement { id, .. } => id,
            _ => continue,
        };

        let forwarded = match read_advertisement(&adapter, &id).await {
            Ok(Some(advertisement)) => {
                if !passes_name_hint(&advertisement, name_prefix.as_deref()) {
                    continue;
                }
                trace!("Advertisement from {}", advertisement.id);
                sink.send(ScanEvent::Advertisement(advertisement))
            }
            Ok(None) => continue,
            Err(e) => {
                warn!("Dropping BLE event: {}", e);
                sink.send(ScanEvent::Error(e.to_string()))
            }
        };

        if forwarded.is_err() {
            debug!("Scan sink closed, stopping event forwarding");
            break;
        }
    }
}

async fn read_advertisement(
    adapter: &Adapter,
    id: &PeripheralId,
) -> Result<Option<RawAdvertisement>, BleRadioError> {
    let peripheral = adapter
        .peripheral(id)
        .await
        .map_err(|e| BleRadioError::PropertiesFailed(e.to_string()))?;

    let Some(properties) = peripheral
        .properties()
        .await
        .map_err(|e| BleRadioError::PropertiesFailed(e.to_string()))?
    else {
        return Ok(None);
    };

    let mut advertisement = RawAdvertisement::new(device_id(id, properties.address));
    advertisement.local_name = properties.local_name;
    advertisement.manufacturer_data = properties.manufacturer_data;
    advertisement.rssi = properties.rssi;
    Ok(Some(advertisement))
}

/// Address when the platform exposes one, otherwise the platform's opaque id
fn device_id(id: &PeripheralId, address: BDAddr) -> DeviceId {
    let address = address.to_string();
    if address == "00:00:00:00:00:00" {
        DeviceId::new(format!("{:?}", id))
    } else {
        DeviceId::new(address)
    }
}

/// Cheap pre-filter; the scan session filters again
fn passes_name_hint(advertisement: &RawAdvertisement, prefix: Option<&str>) -> bool {
    match (prefix, advertisement.local_name.as_deref()) {
        (Some(prefix), Some(name)) => name.starts_with(prefix),
        (Some(_), None) => false,
        (None, _) => true,
    }
}
