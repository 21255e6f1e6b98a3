//! Permission gate run before any scan or advertise call
//!
//! Platforms with runtime grants need location access for scanning and, from
//! API level 31, separate Bluetooth scan/connect/advertise grants. The gate asks
//! only for what the requested role needs, treats a partial grant as a denial,
//! and then confirms the adapter is powered.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::errors::PermissionError;

/// First API level with split Bluetooth runtime permissions
pub const SPLIT_BLUETOOTH_PERMISSIONS_API_LEVEL: u32 = 31;

// ----------------------------------------------------------------------------
// Permission Types
// ----------------------------------------------------------------------------

/// Runtime permission understood by the permission subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    FineLocation,
    CoarseLocation,
    BluetoothScan,
    BluetoothConnect,
    BluetoothAdvertise,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::FineLocation => "ACCESS_FINE_LOCATION",
            Permission::CoarseLocation => "ACCESS_COARSE_LOCATION",
            Permission::BluetoothScan => "BLUETOOTH_SCAN",
            Permission::BluetoothConnect => "BLUETOOTH_CONNECT",
            Permission::BluetoothAdvertise => "BLUETOOTH_ADVERTISE",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer to a single permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grant {
    Granted,
    Denied,
    /// Denied and the OS will no longer prompt
    NeverAskAgain,
}

/// Which radio operation the caller is about to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RadioRole {
    Scan,
    Advertise,
}

/// Cached outcome of the permission check for one role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// What the host platform expects from the permission flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlatformProfile {
    /// Whether permissions must be granted at runtime
    pub runtime_grants: bool,
    /// Platform API level; only meaningful with runtime grants
    pub api_level: u32,
}

impl PlatformProfile {
    /// Desktop hosts: no runtime grants, only the adapter check
    pub fn desktop() -> Self {
        Self::default()
    }

    /// Mobile hosts with runtime grants at the given API level
    pub fn runtime(api_level: u32) -> Self {
        Self {
            runtime_grants: true,
            api_level,
        }
    }
}

/// Permissions to request before operating in `role`
pub fn required_permissions(profile: PlatformProfile, role: RadioRole) -> Vec<Permission> {
    if !profile.runtime_grants {
        return Vec::new();
    }

    let mut permissions = vec![Permission::FineLocation, Permission::CoarseLocation];
    if profile.api_level >= SPLIT_BLUETOOTH_PERMISSIONS_API_LEVEL {
        match role {
            RadioRole::Scan => {
                permissions.push(Permission::BluetoothScan);
                permissions.push(Permission::BluetoothConnect);
            }
            RadioRole::Advertise => {
                permissions.push(Permission::BluetoothAdvertise);
                permissions.push(Permission::BluetoothConnect);
            }
        }
    }
    permissions
}

// ----------------------------------------------------------------------------
// Permission Provider
// ----------------------------------------------------------------------------

/// OS permission subsystem
#[async_trait::async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Request several permissions at once; may suspend on a user prompt
    async fn request(
        &self,
        permissions: &[Permission],
    ) -> Result<Vec<(Permission, Grant)>, PermissionError>;

    /// Whether the Bluetooth adapter is powered on
    async fn radio_enabled(&self) -> Result<bool, PermissionError>;
}

// ----------------------------------------------------------------------------
// Permission Gate
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RoleStates {
    scan: PermissionState,
    advertise: PermissionState,
}

impl RoleStates {
    fn get(&self, role: RadioRole) -> PermissionState {
        match role {
            RadioRole::Scan => self.scan,
            RadioRole::Advertise => self.advertise,
        }
    }

    fn get_mut(&mut self, role: RadioRole) -> &mut PermissionState {
        match role {
            RadioRole::Scan => &mut self.scan,
            RadioRole::Advertise => &mut self.advertise,
        }
    }
}

/// Readiness check shared by the scan and advertise paths
///
/// Clones share the same cached [`PermissionState`].
#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    profile: PlatformProfile,
    states: Arc<RwLock<RoleStates>>,
}

impl fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGate")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>, profile: PlatformProfile) -> Self {
        Self {
            provider,
            profile,
            states: Arc::new(RwLock::new(RoleStates::default())),
        }
    }

    pub fn profile(&self) -> PlatformProfile {
        self.profile
    }

    /// Cached permission state for `role`
    pub async fn state(&self, role: RadioRole) -> PermissionState {
        self.states.read().await.get(role)
    }

    /// Forget cached grants so the next check prompts again
    pub async fn reset(&self) {
        *self.states.write().await = RoleStates::default();
    }

    /// Make sure `role` may use the radio
    ///
    /// A cached grant is reused; anything else triggers a fresh request. The
    /// adapter power check runs every time.
    pub async fn ensure_ready(&self, role: RadioRole) -> Result<(), PermissionError> {
        if self.state(role).await != PermissionState::Granted {
            let outcome = self.request_grants(role).await;
            let state = if outcome.is_ok() {
                PermissionState::Granted
            } else {
                PermissionState::Denied
            };
            *self.states.write().await.get_mut(role) = state;
            outcome?;
        }

        if !self.provider.radio_enabled().await? {
            warn!("Bluetooth adapter is powered off");
            return Err(PermissionError::RadioDisabled);
        }

        debug!("Radio ready for {:?}", role);
        Ok(())
    }

    async fn request_grants(&self, role: RadioRole) -> Result<(), PermissionError> {
        let required = required_permissions(self.profile, role);
        if required.is_empty() {
            return Ok(());
        }

        debug!("Requesting permissions for {:?}: {:?}", role, required);
        let answers = self.provider.request(&required).await?;

        let denied: Vec<Permission> = required
            .iter()
            .copied()
            .filter(|permission| {
                !answers
                    .iter()
                    .any(|(p, grant)| p == permission && *grant == Grant::Granted)
            })
            .collect();

        if !denied.is_empty() {
            warn!("Permissions denied for {:?}: {:?}", role, denied);
            return Err(PermissionError::PermissionDenied { denied });
        }

        info!("Permissions granted for {:?}", role);
        Ok(())
    }
}
