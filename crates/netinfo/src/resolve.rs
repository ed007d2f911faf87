use std::net::{IpAddr, ToSocketAddrs};

use tracing::debug;

use crate::NetInfoError;

/// Resolves a host name to its addresses, in resolver order without
/// duplicates.
///
/// Literal IPv4/IPv6 addresses are returned as is without a lookup.
pub fn resolve(name: &str) -> Result<Vec<IpAddr>, NetInfoError> {
    if let Ok(ip) = name.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }

    let addrs = (name, 0u16)
        .to_socket_addrs()
        .map_err(|source| NetInfoError::Resolve {
            name: name.to_string(),
            source,
        })?;

    let mut ips: Vec<IpAddr> = Vec::new();
    for addr in addrs {
        if !ips.contains(&addr.ip()) {
            ips.push(addr.ip());
        }
    }

    if ips.is_empty() {
        return Err(NetInfoError::NoAddress(name.to_string()));
    }
    debug!(name, count = ips.len(), "resolved");
    Ok(ips)
}
