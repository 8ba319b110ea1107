//! Device domain entities and the keep-alive liveness rule.

use chrono::{DateTime, Utc};
use mac_address::MacAddress;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Icon assigned to devices that do not declare one.
pub const DEFAULT_ICON: &str = "question";

/// Display name for devices that declare neither a name, a MAC, nor an IP.
pub const UNKNOWN_NAME: &str = "Unknown";

// ============================================================================
// Device Kind
// ============================================================================

/// Whether a device was declared by the user or merely observed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Declared in the device roster.
    Known,
    /// Observed during a sweep but not declared anywhere.
    Unknown,
}

impl DeviceKind {
    /// Sort rank: known devices group before unknown ones.
    fn rank(self) -> u8 {
        match self {
            Self::Known => 0,
            Self::Unknown => 1,
        }
    }

    /// Returns the display label for this kind.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Known => "known",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Device Key
// ============================================================================

/// Stable identity for a device across observation sources.
///
/// Devices with a hardware address are keyed by it (the `MacAddress` type
/// compares by byte value, so case differences in scan output cannot split
/// an identity); IP-only roster entries fall back to their display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceKey {
    /// Keyed by hardware address.
    Mac(MacAddress),
    /// Keyed by display name (roster entries without a MAC).
    Name(String),
}

// ============================================================================
// Device
// ============================================================================

/// A tracked or discovered network endpoint.
///
/// Roster entries live for the process lifetime; `Unknown` entries are
/// synthesized per sweep cycle and discarded when no longer observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Hardware address; unique key when present.
    pub mac_address: Option<MacAddress>,

    /// Network address, used only for reachability probing.
    pub ip_address: Option<Ipv4Addr>,

    /// Display label.
    pub name: String,

    /// Display hint for the presentation layer.
    pub icon: String,

    /// Declared vs observed.
    pub kind: DeviceKind,

    /// Derived liveness; see [`Device::is_online_at`].
    pub online: bool,

    /// Most recent observation where the device answered.
    pub last_seen: Option<DateTime<Utc>>,
}

impl Device {
    /// Synthesizes an entry for an address observed on the wire but not
    /// declared in the roster.
    #[must_use]
    pub fn unknown(mac: MacAddress) -> Self {
        Self {
            mac_address: Some(mac),
            ip_address: None,
            name: mac.to_string(),
            icon: DEFAULT_ICON.to_string(),
            kind: DeviceKind::Unknown,
            online: true,
            last_seen: None,
        }
    }

    /// Returns this device's identity key.
    #[must_use]
    pub fn key(&self) -> DeviceKey {
        match self.mac_address {
            Some(mac) => DeviceKey::Mac(mac),
            None => DeviceKey::Name(self.name.clone()),
        }
    }

    /// Whether this device declares the given hardware address.
    #[must_use]
    pub fn matches_mac(&self, mac: &MacAddress) -> bool {
        self.mac_address == Some(*mac)
    }

    /// The keep-alive rule: online while the last positive observation is
    /// younger than the window. A device that was never seen is offline.
    #[must_use]
    pub fn is_online_at(&self, now: DateTime<Utc>, keep_alive_secs: i64) -> bool {
        match self.last_seen {
            Some(seen) => now.signed_duration_since(seen).num_seconds() < keep_alive_secs,
            None => false,
        }
    }

    /// Records a positive observation.
    pub fn mark_seen(&mut self, now: DateTime<Utc>) {
        self.last_seen = Some(now);
    }

    /// Recomputes `online` from `last_seen` and the keep-alive window.
    pub fn refresh_online(&mut self, now: DateTime<Utc>, keep_alive_secs: i64) {
        self.online = self.is_online_at(now, keep_alive_secs);
    }

    /// Sort key for the merged list: known devices first, then by
    /// case-folded name, then by hardware address.
    #[must_use]
    pub fn sort_key(&self) -> (u8, String, String) {
        (
            self.kind.rank(),
            self.name.to_lowercase(),
            self.mac_address.map(|m| m.to_string()).unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn mac(s: &str) -> MacAddress {
        s.parse().expect("valid MAC")
    }

    fn known(name: &str, mac_str: &str) -> Device {
        Device {
            mac_address: Some(mac(mac_str)),
            ip_address: None,
            name: name.to_string(),
            icon: DEFAULT_ICON.to_string(),
            kind: DeviceKind::Known,
            online: false,
            last_seen: None,
        }
    }

    #[test]
    fn test_unknown_device_fields() {
        let device = Device::unknown(mac("aa:bb:cc:11:22:33"));
        assert_eq!(device.name, "AA:BB:CC:11:22:33");
        assert_eq!(device.icon, DEFAULT_ICON);
        assert_eq!(device.kind, DeviceKind::Unknown);
        assert!(device.online);
        assert!(device.last_seen.is_none());
    }

    #[test]
    fn test_mac_equality_is_case_insensitive() {
        let device = known("Laptop", "AA:BB:CC:11:22:33");
        assert!(device.matches_mac(&mac("aa:bb:cc:11:22:33")));
        assert_eq!(device.key(), DeviceKey::Mac(mac("Aa:Bb:Cc:11:22:33")));
    }

    #[test]
    fn test_keep_alive_boundary() {
        let now = Utc::now();
        let mut device = known("Phone", "AA:BB:CC:11:22:33");

        device.last_seen = Some(now - Duration::seconds(179));
        assert!(device.is_online_at(now, 180));

        device.last_seen = Some(now - Duration::seconds(180));
        assert!(!device.is_online_at(now, 180));

        device.last_seen = Some(now - Duration::seconds(3600));
        assert!(!device.is_online_at(now, 180));
    }

    #[test]
    fn test_never_seen_is_offline() {
        let device = known("Phone", "AA:BB:CC:11:22:33");
        assert!(!device.is_online_at(Utc::now(), 180));
    }

    #[test]
    fn test_mark_seen_then_refresh() {
        let now = Utc::now();
        let mut device = known("Phone", "AA:BB:CC:11:22:33");

        device.mark_seen(now);
        device.refresh_online(now, 180);
        assert!(device.online);
        assert_eq!(device.last_seen, Some(now));
    }

    #[test]
    fn test_sort_known_before_unknown_then_by_name() {
        let mut devices = vec![
            Device::unknown(mac("aa:bb:cc:11:22:33")),
            known("Bob", "11:11:11:11:11:11"),
            known("Alice", "22:22:22:22:22:22"),
        ];
        devices.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "AA:BB:CC:11:22:33"]);
    }

    #[test]
    fn test_sort_name_fold_ignores_case() {
        let mut devices = vec![
            known("bravo", "11:11:11:11:11:11"),
            known("Alpha", "22:22:22:22:22:22"),
        ];
        devices.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        assert_eq!(devices[0].name, "Alpha");
    }

    #[test]
    fn test_name_key_for_ip_only_device() {
        let device = Device {
            mac_address: None,
            ip_address: Some("192.168.0.5".parse().expect("valid IP")),
            name: "Printer".to_string(),
            icon: DEFAULT_ICON.to_string(),
            kind: DeviceKind::Known,
            online: false,
            last_seen: None,
        };
        assert_eq!(device.key(), DeviceKey::Name("Printer".to_string()));
        assert!(!device.matches_mac(&mac("aa:bb:cc:11:22:33")));
    }
}
