//! Cycle scheduler - drives reconciliation at a fixed interval.
//!
//! Fires an initial cycle immediately on startup, then every
//! `update_interval` seconds, forever, until shutdown. There is no jitter,
//! no backoff, and no skip-if-busy guard: the sweep and the probes run as
//! detached tasks, so a slow scan simply overlaps the next tick and the
//! reconciler's per-device merges absorb the interleaving.

use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::prober::ReachabilityProber;
use crate::reconciler::ReconcilerHandle;
use crate::scanner::LinkScanner;

/// Spawns the scheduler task.
///
/// Uses cooperative shutdown via `CancellationToken`; cycles in flight when
/// shutdown begins are abandoned with the rest of the process.
pub fn spawn_scheduler(
    interval_secs: u64,
    scanner: LinkScanner,
    prober: ReachabilityProber,
    reconciler: ReconcilerHandle,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(interval_secs.max(1)));

        info!(interval_secs, "Scan scheduler started");

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    info!("Scan scheduler shutting down");
                    break;
                }

                _ = tick.tick() => {
                    run_cycle(&scanner, &prober, &reconciler);
                }
            }
        }

        debug!("Scan scheduler task completed");
    })
}

/// Starts one reconciliation cycle.
///
/// The sweep and the probes are spawned detached and report their
/// observations to the reconciler themselves; a failed sweep costs this
/// cycle's link-layer observations and nothing else.
fn run_cycle(scanner: &LinkScanner, prober: &ReachabilityProber, reconciler: &ReconcilerHandle) {
    let scanner = scanner.clone();
    let reconciler = reconciler.clone();

    tokio::spawn(async move {
        match scanner.sweep().await {
            Ok(devices) => {
                debug!(observed = devices.len(), "Link-layer sweep complete");
                reconciler.scan_batch(devices).await;
            }
            Err(error) => {
                warn!(%error, "Link-layer sweep failed; dropping this cycle's observations");
            }
        }
    });

    let probes = prober.spawn_probes();
    trace!(probes, "Reachability probes dispatched");
}
