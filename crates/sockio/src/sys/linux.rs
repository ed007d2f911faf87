//! Linux-only socket knobs.

use std::io;
use std::os::fd::BorrowedFd;

use super::{getsockopt_int, setsockopt_int};

/// Keepalive idle/interval/count can be tuned per socket.
pub(crate) const KEEPALIVE_TUNING: bool = true;

/// Asks the kernel to acknowledge immediately instead of delaying the ACK.
///
/// The flag is not sticky, so it has to be re-armed after every receive.
pub(crate) fn quick_ack(fd: BorrowedFd<'_>) -> io::Result<()> {
    setsockopt_int(fd, libc::IPPROTO_TCP, libc::TCP_QUICKACK, 1)
}

/// `MSG_NOSIGNAL` on every send covers this on Linux.
pub(crate) fn set_nosigpipe(_fd: BorrowedFd<'_>) -> io::Result<()> {
    Ok(())
}

pub(crate) fn set_keepalive_tuning(
    fd: BorrowedFd<'_>,
    idle_secs: i32,
    interval_secs: i32,
    count: i32,
) -> io::Result<()> {
    setsockopt_int(fd, libc::SOL_TCP, libc::TCP_KEEPIDLE, idle_secs)?;
    setsockopt_int(fd, libc::SOL_TCP, libc::TCP_KEEPINTVL, interval_secs)?;
    setsockopt_int(fd, libc::SOL_TCP, libc::TCP_KEEPCNT, count)
}

/// Returns `(idle, interval, count)`.
pub(crate) fn keepalive_tuning(fd: BorrowedFd<'_>) -> io::Result<Option<(i32, i32, i32)>> {
    let idle = getsockopt_int(fd, libc::SOL_TCP, libc::TCP_KEEPIDLE)?;
    let interval = getsockopt_int(fd, libc::SOL_TCP, libc::TCP_KEEPINTVL)?;
    let count = getsockopt_int(fd, libc::SOL_TCP, libc::TCP_KEEPCNT)?;
    Ok(Some((idle, interval, count)))
}
