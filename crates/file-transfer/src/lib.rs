//! Whole-file transfer over a connected stream socket.
//!
//! Built on the scalar primitives of `tcpkit-sockio`: every operation picks
//! the blocking or non-blocking strategy once from the socket's mode, moves
//! data in [`TRANSFER_BUFFER_SIZE`] chunks, and reports the exact byte
//! count on failure through [`TransferError`].
//!
//! # Unbounded streams
//!
//! A receive with [`FileSize::Unbounded`] runs until the connection fails.
//! The sender finishes such a stream by appending an 8-byte big-endian
//! length footer (see [`footer`]) and closing; the receiver then checks the
//! footer against what it got and strips it. A bad or missing footer
//! deletes the file.

mod checksum;
mod discard;
pub mod footer;
mod recv;
mod send;
mod zero_copy;

pub use checksum::{file_sha256, sha256_hex};
pub use discard::discard;
pub use footer::send_footer;
pub use recv::{recv_file, recv_file_digest, recv_file_sha256};
pub use send::send_file;

pub use tcpkit_sockio::{IoError, TransferError};

use tcpkit_sockio::{Mode, SocketIo, Timeout};

/// Chunk size for socket-to-disk and disk-to-socket copies: 256 KiB.
pub const TRANSFER_BUFFER_SIZE: usize = 256 * 1024;

/// Largest amount handed to a single zero-copy call: 1 GiB.
pub const ZERO_COPY_MAX_CHUNK: u64 = 1 << 30;

/// Declared size of an incoming file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSize {
    Exact(u64),
    /// Receive until the connection ends, then verify the footer.
    Unbounded,
}

impl From<u64> for FileSize {
    fn from(len: u64) -> Self {
        FileSize::Exact(len)
    }
}

/// Returns `true` when the platform has a zero-copy file-to-socket call.
pub fn zero_copy_available() -> bool {
    zero_copy::AVAILABLE
}

fn recv_chunk(
    io: &SocketIo<'_>,
    mode: Mode,
    buf: &mut [u8],
    timeout: Timeout,
) -> Result<usize, TransferError> {
    match mode {
        Mode::Blocking => io.recv_blocking(buf, timeout),
        Mode::NonBlocking => io.recv_nonblocking(buf, timeout),
    }
}

fn send_chunk(
    io: &SocketIo<'_>,
    mode: Mode,
    buf: &[u8],
    timeout: Timeout,
) -> Result<usize, TransferError> {
    match mode {
        Mode::Blocking => io.send_blocking(buf, timeout),
        Mode::NonBlocking => io.send_nonblocking(buf, timeout),
    }
}
