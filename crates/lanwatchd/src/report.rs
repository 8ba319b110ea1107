//! Presentation and dispatch boundary.
//!
//! Subscribes to presence events and renders them to the structured log:
//! one line per device after each completed sweep cycle, plus occupancy
//! transitions and the fire-and-forget command dispatches. This is the
//! daemon's stand-in for a display surface; anything that can read the log
//! stream can render the list.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lanwatch_core::Device;

use crate::reconciler::{PresenceEvent, ReconcilerHandle};

/// Spawns the report task.
///
/// Logs a waiting state until the first device list arrives, then renders
/// every subsequent list. Shuts down with the cancellation token or when
/// the event channel closes.
pub fn spawn_report_task(
    reconciler: &ReconcilerHandle,
    show_last_seen: bool,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut events = reconciler.subscribe();

    tokio::spawn(async move {
        info!("Waiting for first network scan");

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    info!("Report task shutting down");
                    break;
                }

                event = events.recv() => {
                    match event {
                        Ok(PresenceEvent::DeviceList { devices }) => {
                            log_device_list(&devices, show_last_seen);
                        }
                        Ok(PresenceEvent::Occupancy { occupied }) => {
                            info!(occupied, "Occupancy changed");
                        }
                        Ok(PresenceEvent::Dispatch { command }) => {
                            info!(
                                notification = %command.notification,
                                payload = %command.payload,
                                "Dispatching occupancy command"
                            );
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Report task lagged behind presence events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Presence event channel closed");
                            break;
                        }
                    }
                }
            }
        }
    })
}

/// Renders one merged device list.
fn log_device_list(devices: &[Device], show_last_seen: bool) {
    if devices.is_empty() {
        info!("No devices online");
        return;
    }

    let now = Utc::now();
    for device in devices {
        match device.last_seen.filter(|_| show_last_seen) {
            Some(seen) => info!(
                name = %device.name,
                kind = %device.kind,
                online = device.online,
                last_seen = %last_seen_age(now, seen),
                "Device"
            ),
            None => info!(
                name = %device.name,
                kind = %device.kind,
                online = device.online,
                "Device"
            ),
        }
    }
}

/// Formats how long ago a device was last observed.
fn last_seen_age(now: DateTime<Utc>, seen: DateTime<Utc>) -> String {
    let secs = now.signed_duration_since(seen).num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
