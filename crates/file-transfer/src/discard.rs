use tcpkit_sockio::{SocketIo, Timeout, TransferError};

use crate::{TRANSFER_BUFFER_SIZE, recv_chunk};

/// Reads and drops `len` bytes from the socket.
///
/// Used to skip input the caller does not want without buffering it. On
/// failure the error carries how many bytes were consumed.
pub fn discard(io: &SocketIo<'_>, len: u64, timeout: Timeout) -> Result<u64, TransferError> {
    let mode = io.mode().map_err(TransferError::at_start)?;
    let mut buf = vec![0u8; (TRANSFER_BUFFER_SIZE as u64).min(len) as usize];
    let mut done = 0u64;
    while done < len {
        let want = (len - done).min(TRANSFER_BUFFER_SIZE as u64) as usize;
        recv_chunk(io, mode, &mut buf[..want], timeout)
            .map_err(|e| TransferError::new(e.kind, done + e.transferred))?;
        done += want as u64;
    }
    Ok(done)
}
