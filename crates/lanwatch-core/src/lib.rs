//! Lanwatch Core - Shared domain types for network presence detection
//!
//! This crate provides the types shared between the daemon (lanwatchd)
//! and its tests:
//! - `device` - the `Device` entity and the keep-alive liveness rule
//! - `roster` - the user-declared set of tracked devices
//! - `config` - daemon configuration loaded from TOML
//!
//! All production code follows the panic-free policy: no `.unwrap()`,
//! `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

pub mod config;
pub mod device;
pub mod roster;

// Re-exports for convenience
pub use config::{AppConfig, CommandSpec, ConfigError, DeviceSpec, ScanTarget};
pub use device::{Device, DeviceKey, DeviceKind, DEFAULT_ICON, UNKNOWN_NAME};
pub use roster::DeviceRoster;
