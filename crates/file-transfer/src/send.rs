//! File-to-socket send.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::os::fd::AsFd;
use std::path::Path;

use tcpkit_sockio::readiness::wait_ready;
use tcpkit_sockio::{Interest, IoError, Mode, SocketIo, Timeout, TransferError};
use tracing::debug;

use crate::{TRANSFER_BUFFER_SIZE, ZERO_COPY_MAX_CHUNK, send_chunk, zero_copy};

fn short_file() -> IoError {
    IoError::InvalidData("file ended before the requested range".into())
}

/// Sends `len` bytes of the file at `path`, starting at `offset`.
///
/// Blocking sockets use the platform's zero-copy call when there is one,
/// looping over chunks of at most [`ZERO_COPY_MAX_CHUNK`]. Non-blocking
/// sockets, and platforms without zero-copy, go through a read-then-send
/// loop. Either way the socket's mode is left untouched and `Ok` carries
/// `len`; on failure the error carries the bytes already sent.
pub fn send_file(
    io: &SocketIo<'_>,
    path: impl AsRef<Path>,
    offset: u64,
    len: u64,
    timeout: Timeout,
) -> Result<u64, TransferError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(TransferError::at_start)?;
    let file_len = file.metadata().map_err(TransferError::at_start)?.len();
    if offset.checked_add(len).is_none_or(|end| end > file_len) {
        return Err(TransferError::at_start(IoError::InvalidArgument(format!(
            "range {offset}+{len} exceeds file size {file_len} of {}",
            path.display()
        ))));
    }

    let mode = io.mode().map_err(TransferError::at_start)?;
    if zero_copy::AVAILABLE && mode == Mode::Blocking {
        debug!(path = %path.display(), offset, len, "zero-copy send");
        send_zero_copy(io, &file, offset, len, timeout)
    } else {
        debug!(path = %path.display(), offset, len, "buffered send");
        send_buffered(io, mode, file, offset, len, timeout)
    }
}

fn send_zero_copy(
    io: &SocketIo<'_>,
    file: &File,
    offset: u64,
    len: u64,
    timeout: Timeout,
) -> Result<u64, TransferError> {
    let mut sent = 0u64;
    while sent < len {
        wait_ready(io.fd(), Interest::Writable, timeout, io.context())
            .map_err(|e| TransferError::new(e, sent))?;

        let chunk = (len - sent).min(ZERO_COPY_MAX_CHUNK) as usize;
        match zero_copy::send_at(io.fd(), file.as_fd(), offset + sent, chunk) {
            Ok(0) => return Err(TransferError::new(short_file(), sent)),
            Ok(n) => sent += n as u64,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e)
                if e.raw_os_error() == Some(libc::EINTR) && io.context().retry_on_interrupt =>
            {
                continue;
            }
            Err(e) => return Err(TransferError::new(e.into(), sent)),
        }
    }
    Ok(sent)
}

pub(crate) fn send_buffered(
    io: &SocketIo<'_>,
    mode: Mode,
    mut file: File,
    offset: u64,
    len: u64,
    timeout: Timeout,
) -> Result<u64, TransferError> {
    if offset > 0 {
        file.seek(SeekFrom::Start(offset))
            .map_err(TransferError::at_start)?;
    }

    let mut buf = vec![0u8; (TRANSFER_BUFFER_SIZE as u64).min(len) as usize];
    let mut sent = 0u64;
    while sent < len {
        let want = (len - sent).min(TRANSFER_BUFFER_SIZE as u64) as usize;
        let n = match file.read(&mut buf[..want]) {
            Ok(0) => return Err(TransferError::new(short_file(), sent)),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::new(e.into(), sent)),
        };

        send_chunk(io, mode, &buf[..n], timeout)
            .map_err(|e| TransferError::new(e.kind, sent + e.transferred))?;
        sent += n as u64;
    }
    Ok(sent)
}
