//! Daemon configuration, loaded once at startup and immutable thereafter.

use std::fmt;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use mac_address::MacAddress;
use serde::Deserialize;
use thiserror::Error;

/// Default keep-alive window in seconds.
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 180;

/// Default scan interval in seconds.
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 20;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ============================================================================
// Declarations
// ============================================================================

/// A declared device, as written in the config file.
///
/// All fields are optional; the roster applies the defaulting rules when it
/// is built. Malformed declarations are defaulted, never rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceSpec {
    /// Hardware address; any letter case, canonicalized on parse.
    pub mac_address: Option<MacAddress>,
    /// Network address for reachability probing.
    pub ip_address: Option<Ipv4Addr>,
    /// Display label.
    pub name: Option<String>,
    /// Display hint.
    pub icon: Option<String>,
}

/// Command forwarded to the dispatch sink on an occupancy transition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandSpec {
    /// Opaque identifier understood by the sink.
    pub notification: String,
    /// Free-form payload, forwarded verbatim.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Target of the link-layer sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    /// Sweep the entire local subnet (the tool's `-l` sentinel).
    LocalSubnet,
    /// Explicit CIDR or address range, passed through to the tool.
    Range(String),
}

impl ScanTarget {
    /// The argument handed to the sweep tool.
    #[must_use]
    pub fn as_arg(&self) -> &str {
        match self {
            Self::LocalSubnet => "-l",
            Self::Range(range) => range,
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalSubnet => write!(f, "local subnet"),
            Self::Range(range) => write!(f, "{range}"),
        }
    }
}

// ============================================================================
// App Config
// ============================================================================

/// Complete daemon configuration.
///
/// Every field has a default, so an empty file is a valid configuration
/// (an empty roster that scans the local subnet every 20 seconds).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Declared devices.
    pub devices: Vec<DeviceSpec>,

    /// Show observed devices that are not declared.
    pub show_unknown: bool,

    /// Keep declared devices in the list even while offline.
    pub show_offline: bool,

    /// Render how long ago each device was last observed.
    pub show_last_seen: bool,

    /// Seconds a device stays online after its last positive observation.
    pub keep_alive: u64,

    /// Seconds between scan cycles.
    pub update_interval: u64,

    /// Device names whose liveness drives the occupancy signal.
    pub residents: Vec<String>,

    /// Dispatched when the first resident comes back online.
    pub occupied_cmd: Option<CommandSpec>,

    /// Dispatched when the last resident goes offline.
    pub vacant_cmd: Option<CommandSpec>,

    /// Sweep target override (CIDR/range); local subnet when unset.
    pub network: Option<String>,

    /// Raise the default log level to debug.
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            show_unknown: true,
            show_offline: true,
            show_last_seen: false,
            keep_alive: DEFAULT_KEEP_ALIVE_SECS,
            update_interval: DEFAULT_UPDATE_INTERVAL_SECS,
            residents: Vec::new(),
            occupied_cmd: None,
            vacant_cmd: None,
            network: None,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Loads and parses the TOML config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::de::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The link-layer sweep target derived from `network`.
    #[must_use]
    pub fn scan_target(&self) -> ScanTarget {
        match &self.network {
            Some(range) => ScanTarget::Range(range.clone()),
            None => ScanTarget::LocalSubnet,
        }
    }

    /// Keep-alive window as the signed seconds the liveness rule compares
    /// against.
    #[must_use]
    pub fn keep_alive_secs(&self) -> i64 {
        self.keep_alive as i64
    }
}
