use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::Serialize;

use crate::NetInfoError;

/// One local network interface and its addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceConfig {
    pub name: String,
    pub ipv4: Vec<Ipv4Addr>,
    pub ipv6: Vec<Ipv6Addr>,
    /// Hardware address as `aa:bb:cc:dd:ee:ff`, where the platform exposes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

/// Lists the local interfaces, sorted by name, with every address grouped
/// under its interface.
pub fn list_interfaces() -> Result<Vec<InterfaceConfig>, NetInfoError> {
    let mut by_name: BTreeMap<String, InterfaceConfig> = BTreeMap::new();

    for iface in if_addrs::get_if_addrs()? {
        let entry = by_name
            .entry(iface.name.clone())
            .or_insert_with(|| InterfaceConfig {
                name: iface.name.clone(),
                mac: mac_address(&iface.name),
                ..Default::default()
            });
        match iface.ip() {
            IpAddr::V4(ip) => entry.ipv4.push(ip),
            IpAddr::V6(ip) => entry.ipv6.push(ip),
        }
    }

    Ok(by_name.into_values().collect())
}

#[cfg(target_os = "linux")]
fn mac_address(name: &str) -> Option<String> {
    let raw = std::fs::read_to_string(format!("/sys/class/net/{name}/address")).ok()?;
    let mac = raw.trim();
    if mac.is_empty() {
        None
    } else {
        Some(mac.to_ascii_lowercase())
    }
}

#[cfg(not(target_os = "linux"))]
fn mac_address(_name: &str) -> Option<String> {
    None
}

/// Returns local non-loopback IPv4 addresses, excluding link-local (169.254.x.x).
pub fn local_addrs() -> Vec<IpAddr> {
    let Ok(interfaces) = if_addrs::get_if_addrs() else {
        return Vec::new();
    };

    interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .filter_map(|iface| match iface.ip() {
            IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_link_local() => Some(IpAddr::V4(ip)),
            _ => None,
        })
        .collect()
}

/// The local host name, or `"unknown"` when it is not valid UTF-8.
pub fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".into())
}
