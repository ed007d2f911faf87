//! Blocking wait for socket readiness.
//!
//! The leaf every other component suspends in. One call is one `poll(2)`;
//! [`wait_ready`] adds the interrupt-retry policy on top.

use std::os::fd::BorrowedFd;

use crate::context::IoContext;
use crate::error::IoError;
use crate::sys;
use crate::timeout::Timeout;

/// Direction to wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Readable,
    Writable,
    /// Either direction; used while a connect is in flight.
    Either,
}

impl Interest {
    fn events(self) -> libc::c_short {
        match self {
            Interest::Readable => libc::POLLIN,
            Interest::Writable => libc::POLLOUT,
            Interest::Either => libc::POLLIN | libc::POLLOUT,
        }
    }
}

/// Outcome of a single wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
    /// The kernel reported an error or hang-up with nothing left to do in
    /// the requested direction.
    PeerError,
    /// A signal arrived before anything else happened.
    Interrupted,
}

/// Waits once for `interest` on `fd`.
///
/// A hang-up that still has readable data pending reports
/// [`Readiness::Ready`] so the caller can drain it; the next receive then
/// sees the end of stream.
pub fn wait(fd: BorrowedFd<'_>, interest: Interest, timeout: Timeout) -> Result<Readiness, IoError> {
    match sys::poll(fd, interest.events(), timeout.as_poll_millis()) {
        Ok(None) => Ok(Readiness::TimedOut),
        Ok(Some(revents)) => Ok(classify(interest, revents)),
        Err(e) if e.raw_os_error() == Some(libc::EINTR) => Ok(Readiness::Interrupted),
        Err(e) => Err(e.into()),
    }
}

fn classify(interest: Interest, revents: libc::c_short) -> Readiness {
    if revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
        return Readiness::PeerError;
    }
    if revents & libc::POLLHUP != 0 && revents & interest.events() & libc::POLLIN == 0 {
        return Readiness::PeerError;
    }
    Readiness::Ready
}

/// Waits for `interest`, re-arming the same timeout after every
/// interruption when `ctx` allows it.
///
/// Maps the non-ready outcomes to errors: timed-out, not-connected for a
/// peer error, interrupted when retrying is off.
pub fn wait_ready(
    fd: BorrowedFd<'_>,
    interest: Interest,
    timeout: Timeout,
    ctx: &IoContext,
) -> Result<(), IoError> {
    loop {
        match wait(fd, interest, timeout)? {
            Readiness::Ready => return Ok(()),
            Readiness::TimedOut => return Err(IoError::TimedOut),
            Readiness::PeerError => return Err(IoError::NotConnected),
            Readiness::Interrupted if ctx.retry_on_interrupt => continue,
            Readiness::Interrupted => return Err(IoError::Interrupted),
        }
    }
}
