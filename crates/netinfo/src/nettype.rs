//! Inner/outer network buckets.
//!
//! Inner means one of the RFC 1918 private ranges, split by range so a
//! deployment can prefer, say, its 10.x network over its 192.168.x one.

use std::fmt;
use std::net::IpAddr;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetType {
    /// Unknown name or unparsable address.
    None,
    /// Matches every bucket; only produced from a name.
    Any,
    Outer,
    /// Any private range; only produced from a name.
    Inner,
    Inner10,
    Inner172,
    Inner192,
}

impl NetType {
    /// Parses a configured net type, case-insensitively. An empty name
    /// means [`NetType::Any`]; unknown names give [`NetType::None`].
    ///
    /// Each private range accepts `inner-10`, `inner_10` and `inner10`
    /// style spellings.
    pub fn from_name(name: &str) -> NetType {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "" | "any" => NetType::Any,
            "outer" => NetType::Outer,
            "inner" => NetType::Inner,
            "inner-10" | "inner_10" | "inner10" => NetType::Inner10,
            "inner-172" | "inner_172" | "inner172" => NetType::Inner172,
            "inner-192" | "inner_192" | "inner192" => NetType::Inner192,
            _ => NetType::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetType::None => "none",
            NetType::Any => "any",
            NetType::Outer => "outer",
            NetType::Inner => "inner",
            NetType::Inner10 => "inner-10",
            NetType::Inner172 => "inner-172",
            NetType::Inner192 => "inner-192",
        }
    }

    pub fn is_inner(&self) -> bool {
        matches!(
            self,
            NetType::Inner | NetType::Inner10 | NetType::Inner172 | NetType::Inner192
        )
    }

    /// Whether an address classified as `actual` satisfies this filter.
    pub fn accepts(&self, actual: NetType) -> bool {
        match self {
            NetType::Any => actual != NetType::None,
            NetType::Inner => actual.is_inner(),
            other => *other == actual && actual != NetType::None,
        }
    }
}

impl fmt::Display for NetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buckets an address. IPv6 addresses are always outer.
pub fn classify_addr(ip: IpAddr) -> NetType {
    let IpAddr::V4(v4) = ip else {
        return NetType::Outer;
    };
    match v4.octets() {
        [10, ..] => NetType::Inner10,
        [192, 168, ..] => NetType::Inner192,
        [172, b, ..] if (16..32).contains(&b) => NetType::Inner172,
        _ => NetType::Outer,
    }
}

/// Buckets a textual address; anything that does not parse is
/// [`NetType::None`].
pub fn classify(ip: &str) -> NetType {
    match ip.trim().parse::<IpAddr>() {
        Ok(addr) => classify_addr(addr),
        Err(_) => NetType::None,
    }
}
