//! Host network lookups used around the socket primitives.
//!
//! Thin wrappers with no retry logic: name resolution, local interface
//! enumeration, and classification of addresses into inner/outer network
//! buckets.

mod interfaces;
mod nettype;
mod resolve;

pub use interfaces::{InterfaceConfig, hostname, list_interfaces, local_addrs};
pub use nettype::{NetType, classify, classify_addr};
pub use resolve::resolve;

/// Errors for network lookups.
#[derive(Debug, thiserror::Error)]
pub enum NetInfoError {
    #[error("cannot resolve {name}: {source}")]
    Resolve {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no addresses found for {0}")]
    NoAddress(String),

    #[error("interface enumeration failed: {0}")]
    Interfaces(#[from] std::io::Error),
}
