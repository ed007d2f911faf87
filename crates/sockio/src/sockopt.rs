//! Socket options applied at connection setup.
//!
//! Each setter is an independent fallible step. [`set_server_options`]
//! chains them the way a server configures an accepted connection:
//! linger is fatal, the send/receive timeouts are best effort.

use std::os::fd::AsFd;
use std::time::Duration;

use socket2::SockRef;
use tracing::{error, info, warn};

use crate::context::IoContext;
use crate::error::IoError;
use crate::sys;
use crate::timeout::Timeout;

/// Probe interval used when tuning keepalive.
pub const KEEPALIVE_INTERVAL_SECS: i32 = 10;

/// Unanswered probes before the connection is dropped.
pub const KEEPALIVE_PROBES: i32 = 3;

/// Keepalive idle time used when the network timeout is infinite.
pub const DEFAULT_KEEPALIVE_IDLE_SECS: i32 = 60;

/// Keepalive state read back from a socket.
///
/// `idle`, `interval` and `count` are `None` where the platform does not
/// expose per-socket tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveInfo {
    pub enabled: bool,
    pub idle: Option<i32>,
    pub interval: Option<i32>,
    pub count: Option<i32>,
}

/// Sets `SO_LINGER`. `None` disables lingering.
pub fn set_linger<F: AsFd>(socket: &F, linger: Option<Duration>) -> Result<(), IoError> {
    SockRef::from(socket).set_linger(linger).map_err(|e| {
        error!(errno = e.raw_os_error(), error = %e, "setsockopt(SO_LINGER) failed");
        IoError::from(e)
    })
}

pub fn linger<F: AsFd>(socket: &F) -> Result<Option<Duration>, IoError> {
    Ok(SockRef::from(socket).linger()?)
}

/// Sets `SO_SNDTIMEO` and `SO_RCVTIMEO`. An infinite timeout clears both.
pub fn set_timeouts<F: AsFd>(socket: &F, timeout: Timeout) -> Result<(), IoError> {
    let sock = SockRef::from(socket);
    let value = timeout.as_duration();
    sock.set_write_timeout(value)?;
    sock.set_read_timeout(value)?;
    Ok(())
}

/// Enables `SO_KEEPALIVE` and, where supported, tunes the idle time with
/// a fixed probe interval and count.
pub fn set_keepalive<F: AsFd>(socket: &F, idle_secs: i32) -> Result<(), IoError> {
    let fd = socket.as_fd();
    sys::setsockopt_int(fd, libc::SOL_SOCKET, libc::SO_KEEPALIVE, 1).map_err(|e| {
        error!(errno = e.raw_os_error(), error = %e, "setsockopt(SO_KEEPALIVE) failed");
        IoError::from(e)
    })?;

    if sys::KEEPALIVE_TUNING {
        sys::set_keepalive_tuning(fd, idle_secs.max(1), KEEPALIVE_INTERVAL_SECS, KEEPALIVE_PROBES)
            .map_err(|e| {
                error!(idle_secs, errno = e.raw_os_error(), error = %e, "keepalive tuning failed");
                IoError::from(e)
            })?;
    }
    Ok(())
}

/// Reads back the keepalive configuration and logs it.
pub fn keepalive_info<F: AsFd>(socket: &F) -> Result<KeepaliveInfo, IoError> {
    let fd = socket.as_fd();
    let enabled = sys::getsockopt_int(fd, libc::SOL_SOCKET, libc::SO_KEEPALIVE)? != 0;
    let tuning = sys::keepalive_tuning(fd)?;

    let info = KeepaliveInfo {
        enabled,
        idle: tuning.map(|t| t.0),
        interval: tuning.map(|t| t.1),
        count: tuning.map(|t| t.2),
    };
    info!(
        enabled = info.enabled,
        idle = ?info.idle,
        interval = ?info.interval,
        count = ?info.count,
        "keepalive"
    );
    Ok(info)
}

/// Disables Nagle's algorithm.
pub fn set_nodelay<F: AsFd>(socket: &F) -> Result<(), IoError> {
    sys::setsockopt_int(socket.as_fd(), libc::IPPROTO_TCP, libc::TCP_NODELAY, 1).map_err(|e| {
        error!(errno = e.raw_os_error(), error = %e, "setsockopt(TCP_NODELAY) failed");
        IoError::from(e)
    })
}

pub fn nodelay<F: AsFd>(socket: &F) -> Result<bool, IoError> {
    Ok(sys::getsockopt_int(socket.as_fd(), libc::IPPROTO_TCP, libc::TCP_NODELAY)? != 0)
}

/// Applies the quick-ack hint when `ctx` enables it. A no-op off Linux.
pub fn set_quick_ack<F: AsFd>(socket: &F, ctx: &IoContext) -> Result<(), IoError> {
    if ctx.quick_ack {
        sys::quick_ack(socket.as_fd())?;
    }
    Ok(())
}

/// Keepalive idle time derived from a network timeout: twice the timeout
/// plus one second, so an idle peer is probed only after a full timeout
/// round trip could have elapsed.
pub fn keepalive_idle_for(timeout: Timeout) -> i32 {
    match timeout.as_duration() {
        Some(d) => {
            let secs = i32::try_from(d.as_secs()).unwrap_or(i32::MAX / 2);
            secs.saturating_mul(2).saturating_add(1)
        }
        None => DEFAULT_KEEPALIVE_IDLE_SECS,
    }
}

/// Keepalive, no-delay and quick-ack for a connected socket.
pub fn tune_connection<F: AsFd>(
    socket: &F,
    timeout: Timeout,
    ctx: &IoContext,
) -> Result<(), IoError> {
    set_keepalive(socket, keepalive_idle_for(timeout))?;
    set_nodelay(socket)?;
    set_quick_ack(socket, ctx)
}

/// Server-side setup for an accepted or listening socket.
///
/// Suppresses `SIGPIPE` where a socket option exists, disables linger,
/// applies `timeout` as the kernel send/receive timeout (failures only
/// warn), then runs [`tune_connection`].
pub fn set_server_options<F: AsFd>(
    socket: &F,
    timeout: Timeout,
    ctx: &IoContext,
) -> Result<(), IoError> {
    if let Err(e) = sys::set_nosigpipe(socket.as_fd()) {
        warn!(error = %e, "failed to disable SIGPIPE on socket");
    }

    set_linger(socket, None)?;

    if let Err(e) = set_timeouts(socket, timeout) {
        warn!(errno = e.errno(), error = %e, "setting socket send/recv timeout failed");
    }

    tune_connection(socket, timeout, ctx)
}
