use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};

pub(crate) const AVAILABLE: bool = true;

pub(crate) fn send_at(
    socket: BorrowedFd<'_>,
    file: BorrowedFd<'_>,
    offset: u64,
    len: usize,
) -> io::Result<usize> {
    let off = libc::off_t::try_from(offset)
        .map_err(|_| io::Error::from_raw_os_error(libc::EOVERFLOW))?;
    let mut sent: libc::off_t = 0;
    let ret = unsafe {
        libc::sendfile(
            file.as_raw_fd(),
            socket.as_raw_fd(),
            off,
            len,
            std::ptr::null_mut(),
            &mut sent,
            0,
        )
    };
    if ret != 0 && sent == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(sent as usize)
    }
}
