//! Reachability probes - one-shot ping per declared host.
//!
//! Every roster device with a network address gets its own detached probe
//! task per cycle; results flow back to the reconciler as individual
//! observation messages with no ordering guarantees. An unreachable host is
//! a valid negative result, never an error - including the case where the
//! probe tool itself cannot run.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, trace};

use lanwatch_core::DeviceRoster;

use crate::reconciler::ReconcilerHandle;

/// The external probe tool.
pub const PROBE_PROGRAM: &str = "ping";

/// Per-probe timeout handed to the tool, in seconds.
pub const PROBE_TIMEOUT_SECS: u32 = 2;

/// Fans out reachability probes for the declared devices.
///
/// Cheap to clone; holds only shared handles.
#[derive(Clone)]
pub struct ReachabilityProber {
    roster: Arc<DeviceRoster>,
    reconciler: ReconcilerHandle,
}

impl ReachabilityProber {
    /// Creates a prober over the given roster.
    #[must_use]
    pub fn new(roster: Arc<DeviceRoster>, reconciler: ReconcilerHandle) -> Self {
        Self { roster, reconciler }
    }

    /// Spawns one probe task per device that declares a network address.
    ///
    /// Devices without an address are skipped entirely. Returns the number
    /// of probes dispatched.
    pub fn spawn_probes(&self) -> usize {
        let mut spawned = 0;

        for device in self.roster.devices() {
            let Some(ip) = device.ip_address else {
                continue;
            };

            let key = device.key();
            let name = device.name.clone();
            let reconciler = self.reconciler.clone();

            tokio::spawn(async move {
                let online = probe_host(ip).await;
                trace!(device = %name, %ip, online, "Probe completed");
                reconciler.probe_result(key, online).await;
            });

            spawned += 1;
        }

        spawned
    }
}

/// Sends one echo request and reports whether the host answered.
async fn probe_host(ip: Ipv4Addr) -> bool {
    let result = Command::new(PROBE_PROGRAM)
        .args(["-c", "1", "-W"])
        .arg(PROBE_TIMEOUT_SECS.to_string())
        .arg(ip.to_string())
        .output()
        .await;

    match result {
        Ok(output) => output.status.success(),
        Err(error) => {
            debug!(%ip, %error, "Probe could not run; reporting unreachable");
            false
        }
    }
}
