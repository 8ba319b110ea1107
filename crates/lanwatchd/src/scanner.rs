//! Link-layer sweep - enumerates hardware addresses on the local segment.
//!
//! Runs `arp-scan` as a subprocess and parses its tabular output. The tool
//! needs elevated privileges to open raw sockets; a sweep that cannot run
//! surfaces through the normal [`ScanError`] path and costs one cycle of
//! observations, nothing more.

use std::collections::HashSet;
use std::sync::Arc;

use mac_address::MacAddress;
use thiserror::Error;
use tokio::process::Command;
use tracing::trace;

use lanwatch_core::{Device, DeviceRoster, ScanTarget};

/// The external sweep tool.
pub const SWEEP_PROGRAM: &str = "arp-scan";

/// Header lines the sweep tool prints before the host table.
const SWEEP_HEADER_LINES: usize = 2;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during a link-layer sweep.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The sweep process could not be started.
    #[error("failed to launch arp-scan: {0}")]
    Launch(#[from] std::io::Error),

    /// The sweep process ran but exited with a failure status.
    #[error("arp-scan exited with {status}: {stderr}")]
    SweepFailed {
        status: std::process::ExitStatus,
        stderr: String,
    },
}

// ============================================================================
// Link Scanner
// ============================================================================

/// One-shot link-layer sweep, resolved against the device roster.
///
/// Cheap to clone; each scheduled cycle runs `sweep` on its own task.
#[derive(Clone)]
pub struct LinkScanner {
    roster: Arc<DeviceRoster>,
    target: ScanTarget,
    show_unknown: bool,
}

impl LinkScanner {
    /// Creates a scanner for the given sweep target.
    #[must_use]
    pub fn new(roster: Arc<DeviceRoster>, target: ScanTarget, show_unknown: bool) -> Self {
        Self {
            roster,
            target,
            show_unknown,
        }
    }

    /// Runs one sweep and returns the devices observed online, in discovery
    /// order.
    ///
    /// # Errors
    ///
    /// - `ScanError::Launch` if the tool could not be started
    /// - `ScanError::SweepFailed` if it exited non-zero
    pub async fn sweep(&self) -> Result<Vec<Device>, ScanError> {
        trace!(target = %self.target, "Starting link-layer sweep");

        let output = Command::new(SWEEP_PROGRAM)
            .arg("-q")
            .arg(self.target.as_arg())
            .output()
            .await?;

        if !output.status.success() {
            return Err(ScanError::SweepFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(self.parse_sweep(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Parses the sweep tool's table: two header lines, then one
    /// tab-separated row per discovered host with the hardware address in
    /// the second non-empty cell. Malformed rows are skipped; addresses are
    /// deduplicated, first occurrence wins.
    fn parse_sweep(&self, raw: &str) -> Vec<Device> {
        let mut seen: HashSet<MacAddress> = HashSet::new();
        let mut discovered = Vec::new();

        for row in raw.lines().skip(SWEEP_HEADER_LINES) {
            let cell = match row.split('\t').filter(|c| !c.is_empty()).nth(1) {
                Some(cell) => cell,
                None => continue,
            };

            let mac: MacAddress = match cell.trim().parse() {
                Ok(mac) => mac,
                Err(_) => continue,
            };

            if !seen.insert(mac) {
                continue;
            }

            match self.roster.find_by_mac(&mac) {
                Some(declared) => {
                    let mut device = declared.clone();
                    device.online = true;
                    discovered.push(device);
                }
                None if self.show_unknown => discovered.push(Device::unknown(mac)),
                None => trace!(%mac, "Dropping undeclared address"),
            }
        }

        discovered
    }
}
