//! Integration tests for the Presence Reconciler.
//!
//! These tests drive the reconciler as a complete system through
//! `spawn_reconciler()` and the `ReconcilerHandle` interface, the same way
//! the scheduler's scan and probe tasks do.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use lanwatch_core::{CommandSpec, Device, DeviceRoster, DeviceSpec};
use lanwatchd::reconciler::{spawn_reconciler, PresenceEvent, ReconcilerSettings};

// ============================================================================
// Test Helpers
// ============================================================================

const EVENT_WAIT: Duration = Duration::from_secs(1);

/// Declares a device with a MAC address and a name.
fn spec(mac: &str, name: &str) -> DeviceSpec {
    DeviceSpec {
        mac_address: Some(mac.parse().expect("valid MAC")),
        ip_address: None,
        name: Some(name.to_string()),
        icon: None,
    }
}

/// Resolves a sweep observation the way the scanner does.
fn observed(roster: &DeviceRoster, mac: &str) -> Device {
    let mac = mac.parse().expect("valid MAC");
    match roster.find_by_mac(&mac) {
        Some(declared) => {
            let mut device = declared.clone();
            device.online = true;
            device
        }
        None => Device::unknown(mac),
    }
}

fn settings_with_residents(residents: &[&str]) -> ReconcilerSettings {
    ReconcilerSettings {
        show_offline: true,
        keep_alive_secs: 180,
        residents: residents.iter().map(|r| r.to_string()).collect(),
        occupied_cmd: Some(CommandSpec {
            notification: "OCCUPIED".to_string(),
            payload: serde_json::json!({ "action": "on" }),
        }),
        vacant_cmd: Some(CommandSpec {
            notification: "VACANT".to_string(),
            payload: serde_json::json!({ "action": "off" }),
        }),
    }
}

/// Waits for the next `DeviceList` event, skipping other event kinds.
async fn next_device_list(
    rx: &mut tokio::sync::broadcast::Receiver<PresenceEvent>,
) -> Vec<Device> {
    loop {
        let event = timeout(EVENT_WAIT, rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open");
        if let PresenceEvent::DeviceList { devices } = event {
            return devices;
        }
    }
}

/// Collects the dispatch notifications observed up to and including the next
/// `DeviceList` publication (the batch pipeline emits dispatches first).
async fn dispatches_for_cycle(
    rx: &mut tokio::sync::broadcast::Receiver<PresenceEvent>,
) -> Vec<String> {
    let mut dispatched = Vec::new();
    loop {
        let event = timeout(EVENT_WAIT, rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open");
        match event {
            PresenceEvent::Dispatch { command } => dispatched.push(command.notification),
            PresenceEvent::DeviceList { .. } => return dispatched,
            PresenceEvent::Occupancy { .. } => {}
        }
    }
}

// ============================================================================
// Merge / Publish Tests
// ============================================================================

#[tokio::test]
async fn test_first_batch_publishes_sorted_merged_list() {
    let roster = Arc::new(DeviceRoster::from_specs(&[
        spec("11:11:11:11:11:11", "Bob"),
        spec("22:22:22:22:22:22", "Alice"),
    ]));
    let handle = spawn_reconciler(
        Arc::clone(&roster),
        ReconcilerSettings {
            show_offline: true,
            keep_alive_secs: 180,
            ..Default::default()
        },
    );
    let mut events = handle.subscribe();

    // Bob and an undeclared address answer; Alice does not.
    handle
        .scan_batch(vec![
            observed(&roster, "11:11:11:11:11:11"),
            Device::unknown("aa:bb:cc:11:22:33".parse().expect("valid MAC")),
        ])
        .await;

    let devices = next_device_list(&mut events).await;
    let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob", "AA:BB:CC:11:22:33"]);

    let online: Vec<bool> = devices.iter().map(|d| d.online).collect();
    assert_eq!(online, vec![false, true, true]);
}

#[tokio::test]
async fn test_batch_overwrites_previous_view() {
    let roster = Arc::new(DeviceRoster::from_specs(&[spec("11:11:11:11:11:11", "Bob")]));
    let handle = spawn_reconciler(
        Arc::clone(&roster),
        ReconcilerSettings {
            show_offline: false,
            keep_alive_secs: 180,
            ..Default::default()
        },
    );
    let mut events = handle.subscribe();

    handle
        .scan_batch(vec![observed(&roster, "11:11:11:11:11:11")])
        .await;
    assert_eq!(next_device_list(&mut events).await.len(), 1);

    // Nothing answers the second sweep; with show_offline disabled the
    // published list is empty.
    handle.scan_batch(Vec::new()).await;
    assert!(next_device_list(&mut events).await.is_empty());
}

#[tokio::test]
async fn test_offline_roster_device_keeps_last_seen_across_cycles() {
    let roster = Arc::new(DeviceRoster::from_specs(&[spec("11:11:11:11:11:11", "Bob")]));
    let handle = spawn_reconciler(
        Arc::clone(&roster),
        ReconcilerSettings {
            show_offline: true,
            keep_alive_secs: 180,
            ..Default::default()
        },
    );
    let mut events = handle.subscribe();

    handle
        .scan_batch(vec![observed(&roster, "11:11:11:11:11:11")])
        .await;
    let first = next_device_list(&mut events).await;
    let seen = first[0].last_seen.expect("stamped on observation");

    handle.scan_batch(Vec::new()).await;
    let second = next_device_list(&mut events).await;
    assert!(!second[0].online);
    assert_eq!(second[0].last_seen, Some(seen));
}

// ============================================================================
// Occupancy Tests
// ============================================================================

#[tokio::test]
async fn test_occupancy_edges_fire_exactly_once() {
    let roster = Arc::new(DeviceRoster::from_specs(&[spec("11:11:11:11:11:11", "Alice")]));
    let handle = spawn_reconciler(Arc::clone(&roster), settings_with_residents(&["Alice"]));
    let mut events = handle.subscribe();

    // Startup state is occupied; an empty house transitions to vacant once.
    handle.scan_batch(Vec::new()).await;
    assert_eq!(dispatches_for_cycle(&mut events).await, vec!["VACANT"]);
    assert_eq!(handle.is_occupied().await.ok(), Some(false));

    // Second empty cycle: no duplicate dispatch.
    handle.scan_batch(Vec::new()).await;
    assert!(dispatches_for_cycle(&mut events).await.is_empty());

    // Alice comes back: exactly one occupied dispatch.
    handle
        .scan_batch(vec![observed(&roster, "11:11:11:11:11:11")])
        .await;
    assert_eq!(dispatches_for_cycle(&mut events).await, vec!["OCCUPIED"]);
    assert_eq!(handle.is_occupied().await.ok(), Some(true));

    // Alice stays: no duplicate dispatch.
    handle
        .scan_batch(vec![observed(&roster, "11:11:11:11:11:11")])
        .await;
    assert!(dispatches_for_cycle(&mut events).await.is_empty());

    // Alice leaves again: exactly one vacant dispatch.
    handle.scan_batch(Vec::new()).await;
    assert_eq!(dispatches_for_cycle(&mut events).await, vec!["VACANT"]);
}

#[tokio::test]
async fn test_non_resident_devices_do_not_affect_occupancy() {
    let roster = Arc::new(DeviceRoster::from_specs(&[
        spec("11:11:11:11:11:11", "Alice"),
        spec("22:22:22:22:22:22", "TV"),
    ]));
    let handle = spawn_reconciler(Arc::clone(&roster), settings_with_residents(&["Alice"]));
    let mut events = handle.subscribe();

    // Only the TV answers: still vacant.
    handle
        .scan_batch(vec![observed(&roster, "22:22:22:22:22:22")])
        .await;
    assert_eq!(dispatches_for_cycle(&mut events).await, vec!["VACANT"]);
    assert_eq!(handle.is_occupied().await.ok(), Some(false));
}

// ============================================================================
// Failure Semantics Tests
// ============================================================================

#[tokio::test]
async fn test_failed_cycle_leaves_state_untouched() {
    let roster = Arc::new(DeviceRoster::from_specs(&[spec("11:11:11:11:11:11", "Alice")]));
    let handle = spawn_reconciler(Arc::clone(&roster), settings_with_residents(&["Alice"]));
    let mut events = handle.subscribe();

    handle
        .scan_batch(vec![observed(&roster, "11:11:11:11:11:11")])
        .await;
    let before = next_device_list(&mut events).await;
    let occupied_before = handle.is_occupied().await.expect("actor running");

    // A failed sweep delivers no batch at all; the prior view and the
    // occupancy flag remain authoritative.
    let after = handle.get_devices().await;
    assert_eq!(after, before);
    assert_eq!(handle.is_occupied().await.ok(), Some(occupied_before));
}

#[tokio::test]
async fn test_probe_result_does_not_republish() {
    let roster = Arc::new(DeviceRoster::from_specs(&[DeviceSpec {
        mac_address: Some("11:11:11:11:11:11".parse().expect("valid MAC")),
        ip_address: Some("192.168.0.10".parse().expect("valid IP")),
        name: Some("Alice".to_string()),
        icon: None,
    }]));
    let handle = spawn_reconciler(
        Arc::clone(&roster),
        ReconcilerSettings {
            show_offline: true,
            keep_alive_secs: 180,
            ..Default::default()
        },
    );
    let mut events = handle.subscribe();

    handle.scan_batch(Vec::new()).await;
    let _ = next_device_list(&mut events).await;

    handle.probe_result(roster.devices()[0].key(), true).await;

    // The device was updated in place...
    let devices = handle.get_devices().await;
    assert!(devices[0].online);
    assert!(devices[0].last_seen.is_some());

    // ...but no event was published for the probe.
    assert!(
        timeout(Duration::from_millis(100), events.recv()).await.is_err(),
        "probe path must not publish"
    );
}
