//! The device roster - the user-declared set of tracked devices.
//!
//! Built once from the config at startup, then read-only. The daemon shares
//! it behind an `Arc`; all mutable presence state lives in the reconciler.

use mac_address::MacAddress;

use crate::config::{AppConfig, DeviceSpec};
use crate::device::{Device, DeviceKind, DEFAULT_ICON, UNKNOWN_NAME};

/// Normalized declared-device list with lookup by hardware address.
///
/// Duplicate MAC declarations are a configuration mistake and are not
/// validated: the first declaration wins on lookup.
#[derive(Debug, Clone, Default)]
pub struct DeviceRoster {
    devices: Vec<Device>,
}

impl DeviceRoster {
    /// Builds the roster from the app config's device declarations.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::from_specs(&config.devices)
    }

    /// Builds the roster from raw declarations, applying the defaulting
    /// rules to each.
    #[must_use]
    pub fn from_specs(specs: &[DeviceSpec]) -> Self {
        Self {
            devices: specs.iter().map(normalize).collect(),
        }
    }

    /// Case-insensitive lookup by hardware address; first match wins.
    #[must_use]
    pub fn find_by_mac(&self, mac: &MacAddress) -> Option<&Device> {
        self.devices.iter().find(|d| d.matches_mac(mac))
    }

    /// The normalized declared devices, in declaration order.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Applies the defaulting rules to a raw declaration.
///
/// Name falls back to the MAC, then the IP, then the unknown sentinel;
/// the icon falls back to the default. Blank strings count as unset.
fn normalize(spec: &DeviceSpec) -> Device {
    let name = spec
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| spec.mac_address.map(|m| m.to_string()))
        .or_else(|| spec.ip_address.map(|ip| ip.to_string()))
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    let icon = spec
        .icon
        .as_deref()
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_ICON.to_string());

    Device {
        mac_address: spec.mac_address,
        ip_address: spec.ip_address,
        name,
        icon,
        kind: DeviceKind::Known,
        online: false,
        last_seen: None,
    }
}
