//! Socket-to-file receive.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use sha2::Digest;
use sha2::digest::Output;
use tcpkit_sockio::{IoError, SocketIo, Timeout, TransferError};
use tracing::{debug, warn};

use crate::footer::{self, FOOTER_LEN};
use crate::{FileSize, TRANSFER_BUFFER_SIZE, recv_chunk};

/// Destination file plus its fsync bookkeeping.
struct Sink {
    file: File,
    written: u64,
    since_sync: u64,
    fsync_after: u64,
}

impl Sink {
    fn create(path: &Path, fsync_after: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(path)?;
        Ok(Self {
            file,
            written: 0,
            since_sync: 0,
            fsync_after,
        })
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.file.write_all(data)?;
        self.written += data.len() as u64;

        if self.fsync_after > 0 {
            self.since_sync += data.len() as u64;
            if self.since_sync >= self.fsync_after {
                self.since_sync = 0;
                self.file.sync_all()?;
            }
        }
        Ok(())
    }
}

fn remove_partial(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove partial file");
    }
}

/// Receives `size` bytes into a freshly created (or truncated) file.
///
/// With a positive `fsync_after`, the file is flushed to disk every time
/// that many bytes have been written since the last flush.
///
/// For an exact size any failure deletes the file. For an unbounded size
/// the stream runs until the connection fails; the trailing footer is then
/// verified and stripped, and `Ok` carries the payload length. A footer
/// that is missing or disagrees with the byte count deletes the file and
/// yields [`IoError::InvalidData`].
pub fn recv_file(
    io: &SocketIo<'_>,
    path: impl AsRef<Path>,
    size: FileSize,
    fsync_after: u64,
    timeout: Timeout,
) -> Result<u64, TransferError> {
    receive(io, path.as_ref(), size, fsync_after, timeout, |_| {})
}

/// Receives exactly `size` bytes into a file and returns the digest of
/// everything written.
pub fn recv_file_digest<D: Digest>(
    io: &SocketIo<'_>,
    path: impl AsRef<Path>,
    size: u64,
    fsync_after: u64,
    timeout: Timeout,
) -> Result<Output<D>, TransferError> {
    let mut hasher = D::new();
    receive(
        io,
        path.as_ref(),
        FileSize::Exact(size),
        fsync_after,
        timeout,
        |chunk| hasher.update(chunk),
    )?;
    Ok(hasher.finalize())
}

/// [`recv_file_digest`] with SHA-256, hex encoded.
pub fn recv_file_sha256(
    io: &SocketIo<'_>,
    path: impl AsRef<Path>,
    size: u64,
    fsync_after: u64,
    timeout: Timeout,
) -> Result<String, TransferError> {
    let digest = recv_file_digest::<sha2::Sha256>(io, path, size, fsync_after, timeout)?;
    Ok(hex::encode(digest))
}

fn receive(
    io: &SocketIo<'_>,
    path: &Path,
    size: FileSize,
    fsync_after: u64,
    timeout: Timeout,
    mut observe: impl FnMut(&[u8]),
) -> Result<u64, TransferError> {
    let mode = io.mode().map_err(TransferError::at_start)?;
    let mut out = Sink::create(path, fsync_after).map_err(TransferError::at_start)?;
    let mut buf = vec![0u8; TRANSFER_BUFFER_SIZE];

    loop {
        let want = match size {
            FileSize::Exact(len) => {
                let left = len - out.written;
                if left == 0 {
                    break;
                }
                left.min(TRANSFER_BUFFER_SIZE as u64) as usize
            }
            FileSize::Unbounded => TRANSFER_BUFFER_SIZE,
        };

        let (count, failure) = match recv_chunk(io, mode, &mut buf[..want], timeout) {
            Ok(n) => (n, None),
            Err(e) => (e.transferred as usize, Some(e.kind)),
        };

        match (size, failure) {
            (FileSize::Exact(_), Some(kind)) => {
                let received = out.written + count as u64;
                debug!(path = %path.display(), received, error = %kind, "receive failed");
                drop(out);
                remove_partial(path);
                return Err(TransferError::new(kind, received));
            }
            (_, failure) => {
                if let Err(e) = out.write(&buf[..count]) {
                    let written = out.written;
                    drop(out);
                    remove_partial(path);
                    return Err(TransferError::new(e.into(), written));
                }
                observe(&buf[..count]);

                if let Some(cause) = failure {
                    return finish_unbounded(out, path, cause);
                }
            }
        }
    }

    Ok(out.written)
}

/// Ends an unbounded receive: the last [`FOOTER_LEN`] bytes on disk must
/// hold the length of everything before them.
fn finish_unbounded(out: Sink, path: &Path, cause: IoError) -> Result<u64, TransferError> {
    let total = out.written;
    debug!(path = %path.display(), total, cause = %cause, "unbounded stream ended");

    match strip_footer(&out.file, path, total) {
        Ok(payload) => Ok(payload),
        Err(e) => {
            warn!(path = %path.display(), total, error = %e, "footer check failed, dropping file");
            drop(out);
            remove_partial(path);
            Err(TransferError::new(e, total))
        }
    }
}

fn strip_footer(file: &File, path: &Path, total: u64) -> Result<u64, IoError> {
    if total < FOOTER_LEN as u64 {
        return Err(IoError::InvalidData(format!(
            "stream ended after {total} bytes, before a footer"
        )));
    }

    let mut reader = File::open(path)?;
    reader.seek(SeekFrom::End(-(FOOTER_LEN as i64)))?;
    let mut raw = [0u8; FOOTER_LEN];
    reader.read_exact(&mut raw)?;

    let payload = total - FOOTER_LEN as u64;
    let declared = footer::decode(raw);
    if declared != payload {
        return Err(IoError::InvalidData(format!(
            "footer declares {declared} bytes, received {payload}"
        )));
    }

    file.set_len(payload)?;
    Ok(payload)
}
