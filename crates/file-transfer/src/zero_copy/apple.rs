use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};

pub(crate) const AVAILABLE: bool = true;

/// Darwin reports the bytes sent through `len` even when the call fails
/// with `EAGAIN` or `EINTR`, so a partial count wins over the error.
pub(crate) fn send_at(
    socket: BorrowedFd<'_>,
    file: BorrowedFd<'_>,
    offset: u64,
    len: usize,
) -> io::Result<usize> {
    let off = libc::off_t::try_from(offset)
        .map_err(|_| io::Error::from_raw_os_error(libc::EOVERFLOW))?;
    let mut sent = len as libc::off_t;
    let ret = unsafe {
        libc::sendfile(
            file.as_raw_fd(),
            socket.as_raw_fd(),
            off,
            &mut sent,
            std::ptr::null_mut(),
            0,
        )
    };
    if ret != 0 && sent == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(sent as usize)
    }
}
