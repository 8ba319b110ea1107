//! Reconciler actor - owns the merged device list and the occupancy flag.
//!
//! The actor is the single writer of presence state. Sweep batches and probe
//! results arrive as messages and are applied sequentially, so a batch and a
//! probe landing at the same instant can never lose an update. Liveness is
//! recomputed from stored timestamps at processing time, which makes stale
//! events from an overlapping cycle harmless: they can only move `last_seen`
//! forward.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace};

use lanwatch_core::{AppConfig, CommandSpec, Device, DeviceKey, DeviceRoster};

use super::commands::{PresenceEvent, ReconcilerCommand};

// ============================================================================
// Settings
// ============================================================================

/// Immutable settings the reconciler derives from the app config.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerSettings {
    /// Append declared devices to the list even while offline.
    pub show_offline: bool,
    /// Seconds a device stays online after its last positive observation.
    pub keep_alive_secs: i64,
    /// Device names whose liveness drives the occupancy signal.
    pub residents: Vec<String>,
    /// Dispatched on the vacant -> occupied transition, if configured.
    pub occupied_cmd: Option<CommandSpec>,
    /// Dispatched on the occupied -> vacant transition, if configured.
    pub vacant_cmd: Option<CommandSpec>,
}

impl ReconcilerSettings {
    /// Extracts the reconciler's slice of the app config.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            show_offline: config.show_offline,
            keep_alive_secs: config.keep_alive_secs(),
            residents: config.residents.clone(),
            occupied_cmd: config.occupied_cmd.clone(),
            vacant_cmd: config.vacant_cmd.clone(),
        }
    }
}

// ============================================================================
// Reconciler Actor
// ============================================================================

/// The reconciler actor - owns all presence state.
///
/// # Ownership
///
/// The actor owns:
/// - `network_devices`: the merged view published after the latest sweep
/// - `seen`: last positive observation per device identity
/// - `occupied`: the household occupancy flag
///
/// # Thread Safety
///
/// The actor runs in a single task and processes commands sequentially.
/// All state mutations happen within that task.
pub struct ReconcilerActor {
    /// Command receiver
    receiver: mpsc::Receiver<ReconcilerCommand>,

    /// Event publisher for the report task and other subscribers
    event_publisher: broadcast::Sender<PresenceEvent>,

    /// Read-only declared-device roster
    roster: Arc<DeviceRoster>,

    /// Settings snapshot taken at startup
    settings: ReconcilerSettings,

    /// Merged view from the most recent sweep batch
    network_devices: Vec<Device>,

    /// Last positive observation per device identity. Survives cycles so
    /// offline entries keep their last-seen timestamp, and so probe and
    /// sweep observations for the same device land on one record.
    seen: HashMap<DeviceKey, DateTime<Utc>>,

    /// Occupancy flag, initialized true at startup. An empty house
    /// therefore produces a single vacant transition on the first cycle.
    occupied: bool,
}

impl ReconcilerActor {
    /// Creates a new reconciler actor.
    pub fn new(
        receiver: mpsc::Receiver<ReconcilerCommand>,
        event_publisher: broadcast::Sender<PresenceEvent>,
        roster: Arc<DeviceRoster>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            receiver,
            event_publisher,
            roster,
            settings,
            network_devices: Vec::new(),
            seen: HashMap::new(),
            occupied: true,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all senders dropped).
    pub async fn run(mut self) {
        info!(
            declared = self.roster.len(),
            residents = self.settings.residents.len(),
            "Presence reconciler starting"
        );

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(
            devices = self.network_devices.len(),
            "Presence reconciler stopped"
        );
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: ReconcilerCommand) {
        match cmd {
            ReconcilerCommand::ScanBatch { devices } => self.handle_scan_batch(devices),
            ReconcilerCommand::ProbeResult { key, online } => {
                self.handle_probe_result(key, online);
            }
            ReconcilerCommand::GetDevices { respond_to } => {
                // Ignore send error - client may have dropped the receiver
                let _ = respond_to.send(self.network_devices.clone());
            }
            ReconcilerCommand::GetOccupancy { respond_to } => {
                let _ = respond_to.send(self.occupied);
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Applies one sweep batch.
    ///
    /// Processing order: overwrite the view with the observed set, stamp and
    /// decay liveness, append offline roster devices, sort, re-derive
    /// occupancy, publish.
    fn handle_scan_batch(&mut self, devices: Vec<Device>) {
        let now = Utc::now();

        self.network_devices = devices;

        for device in &mut self.network_devices {
            if device.online {
                device.mark_seen(now);
                self.seen.insert(device.key(), now);
            } else if let Some(&seen) = self.seen.get(&device.key()) {
                device.last_seen = Some(seen);
            }
            // Recompute even for just-stamped devices: the observation may
            // predate `now` in an overlapping cycle.
            device.refresh_online(now, self.settings.keep_alive_secs);
        }

        if self.settings.show_offline {
            for declared in self.roster.devices() {
                let matched = declared
                    .mac_address
                    .map(|mac| self.network_devices.iter().any(|d| d.matches_mac(&mac)))
                    .unwrap_or(false);
                if matched {
                    continue;
                }

                let mut device = declared.clone();
                device.online = false;
                device.last_seen = self.seen.get(&device.key()).copied();
                self.network_devices.push(device);
            }
        }

        self.network_devices
            .sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        debug!(
            devices = self.network_devices.len(),
            online = self.network_devices.iter().filter(|d| d.online).count(),
            "Sweep batch merged"
        );

        self.check_occupancy();

        // Publish the merged list (ignore if no subscribers)
        let _ = self.event_publisher.send(PresenceEvent::DeviceList {
            devices: self.network_devices.clone(),
        });
    }

    /// Applies one probe result.
    ///
    /// Updates only the probed device's transient fields; the sweep batch
    /// remains the sole publish and occupancy trigger.
    fn handle_probe_result(&mut self, key: DeviceKey, online: bool) {
        let now = Utc::now();

        if online {
            self.seen.insert(key.clone(), now);
        }

        match self.network_devices.iter_mut().find(|d| d.key() == key) {
            Some(device) => {
                if online {
                    device.mark_seen(now);
                }
                device.refresh_online(now, self.settings.keep_alive_secs);
                trace!(device = %device.name, online = device.online, "Probe result applied");
            }
            None => {
                trace!(?key, online, "Probe result for device not in current view");
            }
        }
    }

    // ========================================================================
    // Occupancy
    // ========================================================================

    /// Re-derives the occupancy flag from the residents' liveness and emits
    /// events only on transitions, so a held state never repeats a command.
    fn check_occupancy(&mut self) {
        if self.settings.residents.is_empty() {
            return;
        }

        let present = self
            .network_devices
            .iter()
            .filter(|d| d.online && self.settings.residents.contains(&d.name))
            .count();

        debug!(present, occupied = self.occupied, "Occupancy check");

        if present > 0 && !self.occupied {
            self.occupied = true;
            info!(present, "Resident returned; marking occupied");
            let _ = self
                .event_publisher
                .send(PresenceEvent::Occupancy { occupied: true });
            self.dispatch(self.settings.occupied_cmd.clone());
        } else if present == 0 && self.occupied {
            self.occupied = false;
            info!("All residents away; marking vacant");
            let _ = self
                .event_publisher
                .send(PresenceEvent::Occupancy { occupied: false });
            self.dispatch(self.settings.vacant_cmd.clone());
        }
    }

    /// Forwards a transition command to the dispatch sink. An unset command
    /// makes the transition a silent no-op, never an error.
    fn dispatch(&self, command: Option<CommandSpec>) {
        match command {
            Some(command) => {
                info!(notification = %command.notification, "Dispatching occupancy command");
                let _ = self.event_publisher.send(PresenceEvent::Dispatch { command });
            }
            None => debug!("No command configured for this transition"),
        }
    }

    // ========================================================================
    // Accessors (for testing)
    // ========================================================================

    /// Returns the number of devices in the current merged view.
    #[cfg(test)]
    pub fn device_count(&self) -> usize {
        self.network_devices.len()
    }

    /// Returns the current occupancy flag.
    #[cfg(test)]
    pub fn is_occupied(&self) -> bool {
        self.occupied
    }
}
