//! Portable fallbacks for unixes other than Linux.

use std::io;
use std::os::fd::BorrowedFd;

pub(crate) const KEEPALIVE_TUNING: bool = false;

pub(crate) fn quick_ack(_fd: BorrowedFd<'_>) -> io::Result<()> {
    Ok(())
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
pub(crate) fn set_nosigpipe(fd: BorrowedFd<'_>) -> io::Result<()> {
    super::setsockopt_int(fd, libc::SOL_SOCKET, libc::SO_NOSIGPIPE, 1)
}

#[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "freebsd")))]
pub(crate) fn set_nosigpipe(_fd: BorrowedFd<'_>) -> io::Result<()> {
    Ok(())
}

pub(crate) fn set_keepalive_tuning(
    _fd: BorrowedFd<'_>,
    _idle_secs: i32,
    _interval_secs: i32,
    _count: i32,
) -> io::Result<()> {
    Ok(())
}

pub(crate) fn keepalive_tuning(_fd: BorrowedFd<'_>) -> io::Result<Option<(i32, i32, i32)>> {
    Ok(None)
}
