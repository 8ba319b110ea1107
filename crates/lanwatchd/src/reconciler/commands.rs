//! Reconciler commands, errors, and events.
//!
//! This module defines the message types for communicating with the
//! `ReconcilerActor`:
//! - `ReconcilerCommand`: commands sent to the actor
//! - `ReconcilerError`: errors surfaced through the handle
//! - `PresenceEvent`: events published by the reconciler for subscribers

use thiserror::Error;
use tokio::sync::oneshot;

use lanwatch_core::{CommandSpec, Device, DeviceKey};

// ============================================================================
// Reconciler Commands
// ============================================================================

/// Commands sent to the reconciler actor.
///
/// Observation variants are fire-and-forget: per-device merges are
/// commutative and idempotent, so producers never wait, and observations
/// from an overlapping stale cycle are harmless. Query variants carry a
/// oneshot channel for the response.
#[derive(Debug)]
pub enum ReconcilerCommand {
    /// One completed link-layer sweep: the devices observed online this
    /// cycle, in discovery order. Drives the full merge/sort/occupancy
    /// pipeline and a [`PresenceEvent::DeviceList`] publication.
    ScanBatch {
        /// Devices reported online by the scanner
        devices: Vec<Device>,
    },

    /// One completed reachability probe for a single device.
    ///
    /// Updates only that device's transient fields; does not republish.
    ProbeResult {
        /// Identity of the probed device
        key: DeviceKey,
        /// Whether the host answered
        online: bool,
    },

    /// Get the current merged device list.
    GetDevices {
        /// Channel to send the result
        respond_to: oneshot::Sender<Vec<Device>>,
    },

    /// Get the current occupancy flag.
    GetOccupancy {
        /// Channel to send the result
        respond_to: oneshot::Sender<bool>,
    },
}

// ============================================================================
// Reconciler Errors
// ============================================================================

/// Errors surfaced by the reconciler handle.
#[derive(Debug, Clone, Error)]
pub enum ReconcilerError {
    /// The response channel was closed before receiving a response.
    ///
    /// This typically indicates the actor was shut down.
    #[error("reconciler channel closed")]
    ChannelClosed,
}

// ============================================================================
// Presence Events
// ============================================================================

/// Events published by the reconciler to subscribers.
#[derive(Debug, Clone)]
pub enum PresenceEvent {
    /// The merged, sorted device list for a completed sweep cycle.
    DeviceList {
        /// Every visible device with its derived liveness
        devices: Vec<Device>,
    },

    /// The occupancy flag flipped. Emitted on transitions only, never
    /// repeated while the state holds.
    Occupancy {
        /// New occupancy state
        occupied: bool,
    },

    /// A configured command to forward to the dispatch sink,
    /// fire-and-forget.
    Dispatch {
        /// The command as declared in the config
        command: CommandSpec,
    },
}
