//! Presence reconciliation using the Actor pattern.
//!
//! The reconciler is the single owner of presence state: the merged device
//! list, the per-device last-seen store, and the occupancy flag. It receives
//! observation and query commands via a tokio mpsc channel and publishes
//! [`PresenceEvent`]s via broadcast.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐      ┌──────────────────┐      ┌───────────────────┐
//! │ Scanner /    │─────▶│ ReconcilerActor  │─────▶│ Broadcast Channel │
//! │ Prober tasks │      └──────────────────┘      └───────────────────┘
//! └──────────────┘              │                          │
//!        │  ReconcilerCommand   │  merged list,            │ PresenceEvent
//!        │  (mpsc channel)      │  occupancy flag          ▼
//!        ▼                      ▼                  report task / clients
//! ```
//!
//! Sweep batches and probe results may interleave arbitrarily, including
//! across overlapping cycles; the channel serializes them, and merges are
//! last-writer-wins per device, so no interleaving loses an update.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use lanwatch_core::DeviceRoster;

mod actor;
mod commands;
mod handle;

pub use actor::{ReconcilerActor, ReconcilerSettings};
pub use commands::{PresenceEvent, ReconcilerCommand, ReconcilerError};
pub use handle::ReconcilerHandle;

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 100;
const EVENT_BUFFER: usize = 100;

/// Spawn the reconciler actor and return a handle for interaction.
///
/// This function:
/// 1. Creates the command and event channels
/// 2. Spawns the `ReconcilerActor` on a tokio task
/// 3. Returns a `ReconcilerHandle` for producers and subscribers
pub fn spawn_reconciler(roster: Arc<DeviceRoster>, settings: ReconcilerSettings) -> ReconcilerHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let actor = ReconcilerActor::new(cmd_rx, event_tx.clone(), roster, settings);
    tokio::spawn(actor.run());

    ReconcilerHandle::new(cmd_tx, event_tx)
}
