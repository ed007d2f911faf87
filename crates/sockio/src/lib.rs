//! Timeout-bounded socket I/O primitives.
//!
//! Byte-exact transfer over stream sockets in both blocking and
//! non-blocking mode, scatter/gather transfer that windows over the
//! kernel's per-call descriptor limit, connection establishment with a
//! bounded wait, and the socket options servers apply at setup.
//!
//! Sockets are borrowed, never owned: every operation takes something that
//! implements [`AsFd`](std::os::fd::AsFd) and leaves closing to the caller.
//! The only exceptions are the create-and-connect / create-and-listen
//! helpers in [`connect`] and [`listen`], which hand back an owned
//! [`socket2::Socket`].
//!
//! # Timeouts
//!
//! A [`Timeout`] bounds each individual wait for readiness, not the whole
//! operation. A peer that keeps trickling bytes keeps the transfer alive.

pub mod config;
pub mod connect;
pub mod context;
pub mod error;
pub mod listen;
pub mod readiness;
pub mod sockopt;
pub mod timeout;
pub mod vectored;

mod io;
mod line;
mod sys;

#[cfg(test)]
mod testutil;

pub use config::{ConfigError, IoConfig};
pub use context::IoContext;
pub use error::{IoError, SetupError, TransferError};
pub use io::{Mode, SocketIo, set_nonblocking};
pub use readiness::{Interest, Readiness};
pub use timeout::Timeout;
pub use vectored::batch_cap;

/// Upper bound on descriptors presented to a single `readv`/`writev` call.
///
/// The effective cap is the smaller of this and the platform's `IOV_MAX`.
pub const IOV_BATCH_SIZE: usize = 256;

/// Backlog passed to `listen(2)` by [`listen::listen`].
pub const LISTEN_BACKLOG: i32 = 1024;
