//! Lanwatch Daemon - network presence detection engine
//!
//! This crate provides the daemon's moving parts:
//! - `scanner` - link-layer sweep of the local segment
//! - `prober` - per-host reachability probes
//! - `reconciler` - single-writer presence state actor
//! - `scheduler` - periodic cycle driver
//! - `report` - presentation and command-dispatch boundary
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐ tick ┌─────────────┐   ScanBatch    ┌──────────────────┐
//! │ Scheduler │─────▶│ LinkScanner │───────────────▶│ ReconcilerActor  │
//! └───────────┘      └─────────────┘ (mpsc channel) │ (presence state) │
//!       │            ┌─────────────┐   ProbeResult  └────────┬─────────┘
//!       └───────────▶│   Prober    │────────────────▶        │ PresenceEvent
//!                    └─────────────┘                         ▼ (broadcast)
//!                                                    report task / clients
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate avoids `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, and `todo!()`; channel closures and
//! subprocess failures degrade to logged, skipped observations.

pub mod prober;
pub mod reconciler;
pub mod report;
pub mod scanner;
pub mod scheduler;
