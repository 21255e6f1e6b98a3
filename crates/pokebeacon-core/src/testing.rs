//! In-memory radio and permission collaborators
//!
//! Used by the crate's own tests and available to downstream crates through
//! the `testing` feature.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{PermissionError, RadioError};
use crate::permission::{Grant, Permission, PermissionProvider};
use crate::radio::{
    AdvertiseHandle, AdvertisementSpec, RadioDriver, RawAdvertisement, ScanEvent,
    ScanEventSender, ScanFilter,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ----------------------------------------------------------------------------
// Mock Radio
// ----------------------------------------------------------------------------

/// Call recorded by [`MockRadio`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    Acquire,
    Release,
    StartScan,
    StopScan,
    StartAdvertise(String),
    StopAdvertise(AdvertiseHandle),
}

#[derive(Debug, Default)]
struct MockRadioState {
    calls: Vec<RadioCall>,
    scan_sink: Option<ScanEventSender>,
    scan_filter: Option<ScanFilter>,
    next_handle: u64,
    broadcasts: BTreeMap<u64, AdvertisementSpec>,
    fail_scan: Option<String>,
    fail_advertise: Option<String>,
    fail_stop_advertise: Option<String>,
}

/// Scriptable radio driver
#[derive(Debug, Default)]
pub struct MockRadio {
    state: Mutex<MockRadioState>,
}

impl MockRadio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Push an advertisement into the running scan; false if none is running
    pub fn emit(&self, advertisement: RawAdvertisement) -> bool {
        self.send(ScanEvent::Advertisement(advertisement))
    }

    /// Push a driver error into the running scan
    pub fn emit_error(&self, message: &str) -> bool {
        self.send(ScanEvent::Error(message.to_string()))
    }

    fn send(&self, event: ScanEvent) -> bool {
        lock(&self.state)
            .scan_sink
            .as_ref()
            .map(|sink| sink.send(event).is_ok())
            .unwrap_or(false)
    }

    /// Sink handed to the current scan, kept by tests to simulate late callbacks
    pub fn scan_sink(&self) -> Option<ScanEventSender> {
        lock(&self.state).scan_sink.clone()
    }

    pub fn is_scanning(&self) -> bool {
        lock(&self.state).scan_sink.is_some()
    }

    pub fn last_scan_filter(&self) -> Option<ScanFilter> {
        lock(&self.state).scan_filter.clone()
    }

    /// Broadcasts currently on air
    pub fn active_broadcasts(&self) -> Vec<AdvertisementSpec> {
        lock(&self.state).broadcasts.values().cloned().collect()
    }

    pub fn calls(&self) -> Vec<RadioCall> {
        lock(&self.state).calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&RadioCall) -> bool) -> usize {
        lock(&self.state).calls.iter().filter(|call| matches(call)).count()
    }

    pub fn fail_next_scan(&self, reason: &str) {
        lock(&self.state).fail_scan = Some(reason.to_string());
    }

    pub fn fail_next_advertise(&self, reason: &str) {
        lock(&self.state).fail_advertise = Some(reason.to_string());
    }

    pub fn fail_next_stop_advertise(&self, reason: &str) {
        lock(&self.state).fail_stop_advertise = Some(reason.to_string());
    }

    /// Drop every broadcast as if the stack had torn them down on its own
    pub fn forget_broadcasts(&self) {
        lock(&self.state).broadcasts.clear();
    }
}

#[async_trait::async_trait]
impl RadioDriver for MockRadio {
    async fn acquire(&self) -> Result<(), RadioError> {
        lock(&self.state).calls.push(RadioCall::Acquire);
        Ok(())
    }

    async fn release(&self) -> Result<(), RadioError> {
        let mut state = lock(&self.state);
        state.calls.push(RadioCall::Release);
        state.scan_sink = None;
        state.broadcasts.clear();
        Ok(())
    }

    async fn start_scan(&self, filter: ScanFilter, sink: ScanEventSender) -> Result<(), RadioError> {
        let mut state = lock(&self.state);
        state.calls.push(RadioCall::StartScan);
        if let Some(reason) = state.fail_scan.take() {
            return Err(RadioError::Driver { reason });
        }
        state.scan_filter = Some(filter);
        state.scan_sink = Some(sink);
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), RadioError> {
        let mut state = lock(&self.state);
        state.calls.push(RadioCall::StopScan);
        state.scan_sink = None;
        Ok(())
    }

    async fn start_advertise(&self, spec: AdvertisementSpec) -> Result<AdvertiseHandle, RadioError> {
        let mut state = lock(&self.state);
        state
            .calls
            .push(RadioCall::StartAdvertise(spec.local_name.clone()));
        if let Some(reason) = state.fail_advertise.take() {
            return Err(RadioError::Driver { reason });
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.broadcasts.insert(handle, spec);
        Ok(AdvertiseHandle(handle))
    }

    async fn stop_advertise(&self, handle: AdvertiseHandle) -> Result<(), RadioError> {
        let mut state = lock(&self.state);
        state.calls.push(RadioCall::StopAdvertise(handle));
        if let Some(reason) = state.fail_stop_advertise.take() {
            return Err(RadioError::Driver { reason });
        }
        match state.broadcasts.remove(&handle.0) {
            Some(_) => Ok(()),
            None => Err(RadioError::UnknownBroadcast { handle: handle.0 }),
        }
    }
}

// ----------------------------------------------------------------------------
// Mock Permissions
// ----------------------------------------------------------------------------

/// Scriptable permission subsystem
#[derive(Debug)]
pub struct MockPermissions {
    default_grant: Grant,
    overrides: Mutex<HashMap<Permission, Grant>>,
    radio_enabled: AtomicBool,
    failure: Mutex<Option<PermissionError>>,
    requests: Mutex<Vec<Vec<Permission>>>,
    radio_checks: Mutex<usize>,
}

impl MockPermissions {
    fn with_default(default_grant: Grant) -> Arc<Self> {
        Arc::new(Self {
            default_grant,
            overrides: Mutex::new(HashMap::new()),
            radio_enabled: AtomicBool::new(true),
            failure: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            radio_checks: Mutex::new(0),
        })
    }

    /// Grants everything; adapter powered on
    pub fn granting_all() -> Arc<Self> {
        Self::with_default(Grant::Granted)
    }

    /// Denies everything; adapter powered on
    pub fn denying_all() -> Arc<Self> {
        Self::with_default(Grant::Denied)
    }

    /// Override the answer for one permission
    pub fn set_grant(&self, permission: Permission, grant: Grant) {
        lock(&self.overrides).insert(permission, grant);
    }

    pub fn set_radio_enabled(&self, enabled: bool) {
        self.radio_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Make the next request fail outright
    pub fn fail_next_request(&self, error: PermissionError) {
        *lock(&self.failure) = Some(error);
    }

    /// Every permission set requested so far
    pub fn requests(&self) -> Vec<Vec<Permission>> {
        lock(&self.requests).clone()
    }

    pub fn radio_checks(&self) -> usize {
        *lock(&self.radio_checks)
    }
}

#[async_trait::async_trait]
impl PermissionProvider for MockPermissions {
    async fn request(
        &self,
        permissions: &[Permission],
    ) -> Result<Vec<(Permission, Grant)>, PermissionError> {
        lock(&self.requests).push(permissions.to_vec());
        if let Some(error) = lock(&self.failure).take() {
            return Err(error);
        }
        let overrides = lock(&self.overrides);
        Ok(permissions
            .iter()
            .map(|&p| (p, overrides.get(&p).copied().unwrap_or(self.default_grant)))
            .collect())
    }

    async fn radio_enabled(&self) -> Result<bool, PermissionError> {
        *lock(&self.radio_checks) += 1;
        Ok(self.radio_enabled.load(Ordering::SeqCst))
    }
}
