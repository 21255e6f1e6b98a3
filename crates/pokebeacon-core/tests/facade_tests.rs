//! Permission gating and cross-role behaviour of the discovery facade

use pokebeacon_core::testing::{MockPermissions, MockRadio};
use pokebeacon_core::{
    AdvertiseState, DiscoveryConfig, DiscoveryError, DiscoveryFacade, Grant, Permission,
    PermissionError, PermissionGate, PermissionState, PlatformProfile, RadioRole, ScanState,
};

use test_utils::{named, settle, BULBASAUR_ID};

fn android(api_level: u32) -> DiscoveryConfig {
    DiscoveryConfig::default().with_platform(PlatformProfile::runtime(api_level))
}

#[tokio::test]
async fn test_partial_grant_blocks_radio() {
    let radio = MockRadio::new();
    let permissions = MockPermissions::granting_all();
    permissions.set_grant(Permission::BluetoothScan, Grant::Denied);
    let mut discovery = DiscoveryFacade::new(android(31), radio.clone(), permissions.clone());

    let err = discovery.start_scan().await.unwrap_err();
    assert_eq!(
        err,
        DiscoveryError::Permission(PermissionError::PermissionDenied {
            denied: vec![Permission::BluetoothScan],
        })
    );
    assert_eq!(err.category().label(), "permission-denied");
    assert!(radio.calls().is_empty(), "no call may reach the driver");
    assert_eq!(discovery.scan_state().await, ScanState::Idle);
    assert_eq!(
        discovery.permission_gate().state(RadioRole::Scan).await,
        PermissionState::Denied
    );
}

#[tokio::test]
async fn test_partial_grant_blocks_advertise() {
    let radio = MockRadio::new();
    let permissions = MockPermissions::granting_all();
    permissions.set_grant(Permission::BluetoothAdvertise, Grant::NeverAskAgain);
    let mut discovery = DiscoveryFacade::new(android(33), radio.clone(), permissions);

    let err = discovery.start_advertise("Mew").await.unwrap_err();
    assert!(matches!(
        err,
        DiscoveryError::Permission(PermissionError::PermissionDenied { .. })
    ));
    assert!(radio.calls().is_empty());
    assert_eq!(discovery.advertise_state(), AdvertiseState::Idle);
}

#[tokio::test]
async fn test_only_role_specific_permissions_requested() {
    let permissions = MockPermissions::granting_all();
    let mut discovery = DiscoveryFacade::new(android(31), MockRadio::new(), permissions.clone());

    discovery.start_scan().await.unwrap();
    discovery.start_advertise("Mew").await.unwrap();

    let requests = permissions.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].contains(&Permission::BluetoothAdvertise));
    assert!(requests[1].contains(&Permission::BluetoothAdvertise));
    assert!(!requests[1].contains(&Permission::BluetoothScan));
}

#[tokio::test]
async fn test_grant_is_cached_per_run() {
    let permissions = MockPermissions::granting_all();
    let mut discovery = DiscoveryFacade::new(android(31), MockRadio::new(), permissions.clone());

    discovery.start_scan().await.unwrap();
    discovery.start_scan().await.unwrap();
    discovery.start_scan().await.unwrap();

    assert_eq!(permissions.requests().len(), 1);
    // The adapter is still checked every time
    assert_eq!(permissions.radio_checks(), 3);
}

#[tokio::test]
async fn test_denied_is_rechecked_on_demand() {
    let permissions = MockPermissions::denying_all();
    let gate = PermissionGate::new(permissions.clone(), PlatformProfile::runtime(29));

    assert!(gate.ensure_ready(RadioRole::Scan).await.is_err());
    assert_eq!(gate.state(RadioRole::Scan).await, PermissionState::Denied);

    permissions.set_grant(Permission::FineLocation, Grant::Granted);
    permissions.set_grant(Permission::CoarseLocation, Grant::Granted);
    gate.ensure_ready(RadioRole::Scan).await.unwrap();

    assert_eq!(gate.state(RadioRole::Scan).await, PermissionState::Granted);
    assert_eq!(permissions.requests().len(), 2);
}

#[tokio::test]
async fn test_shared_gate_across_facades() {
    let permissions = MockPermissions::granting_all();
    let gate = PermissionGate::new(permissions.clone(), PlatformProfile::runtime(31));

    let mut first = DiscoveryFacade::with_gate(android(31), MockRadio::new(), gate.clone());
    let mut second = DiscoveryFacade::with_gate(android(31), MockRadio::new(), gate);

    first.start_scan().await.unwrap();
    second.start_scan().await.unwrap();
    assert_eq!(permissions.requests().len(), 1);
}

#[tokio::test]
async fn test_radio_disabled_is_distinct() {
    let radio = MockRadio::new();
    let permissions = MockPermissions::granting_all();
    permissions.set_radio_enabled(false);
    let mut discovery = DiscoveryFacade::new(android(31), radio.clone(), permissions.clone());

    let err = discovery.start_advertise("Lapras").await.unwrap_err();
    assert_eq!(err, DiscoveryError::Permission(PermissionError::RadioDisabled));
    assert_eq!(err.category().label(), "radio-disabled");
    assert!(radio.calls().is_empty());

    // Grants were fine, so turning the adapter on is enough
    permissions.set_radio_enabled(true);
    discovery.start_advertise("Lapras").await.unwrap();
    assert_eq!(permissions.requests().len(), 1);
}

#[tokio::test]
async fn test_permission_subsystem_failure_is_denial() {
    let radio = MockRadio::new();
    let permissions = MockPermissions::granting_all();
    permissions.fail_next_request(PermissionError::Unavailable {
        reason: "activity detached".to_string(),
    });
    let mut discovery = DiscoveryFacade::new(android(31), radio.clone(), permissions);

    let err = discovery.start_scan().await.unwrap_err();
    assert_eq!(err.category().label(), "permission-denied");
    assert_eq!(
        discovery.permission_gate().state(RadioRole::Scan).await,
        PermissionState::Denied
    );

    discovery.start_scan().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_scan_and_advertise_coexist() {
    let radio = MockRadio::new();
    let mut discovery =
        DiscoveryFacade::new(DiscoveryConfig::default(), radio.clone(), MockPermissions::granting_all());

    discovery.start_advertise("Pikachu").await.unwrap();
    discovery.start_scan().await.unwrap();
    radio.emit(named(BULBASAUR_ID, "Pokemon:Bulbasaur"));
    settle().await;

    assert_eq!(discovery.advertise_state(), AdvertiseState::Advertising);
    assert_eq!(discovery.scan_state().await, ScanState::Scanning);
    assert_eq!(discovery.current_peers().await.len(), 1);

    discovery.stop_advertise().await.unwrap();
    assert_eq!(discovery.scan_state().await, ScanState::Scanning);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_everything_and_releases_radio() {
    use pokebeacon_core::testing::RadioCall;

    let radio = MockRadio::new();
    let mut discovery =
        DiscoveryFacade::new(DiscoveryConfig::default(), radio.clone(), MockPermissions::granting_all());

    discovery.start_advertise("Pikachu").await.unwrap();
    discovery.start_scan().await.unwrap();
    discovery.shutdown().await.unwrap();

    assert_eq!(discovery.scan_state().await, ScanState::Stopped);
    assert_eq!(discovery.advertise_state(), AdvertiseState::Idle);
    assert!(radio.active_broadcasts().is_empty());
    assert!(!radio.is_scanning());
    assert_eq!(radio.calls().last(), Some(&RadioCall::Release));
    assert_eq!(radio.count(|call| *call == RadioCall::Acquire), 1);
}
