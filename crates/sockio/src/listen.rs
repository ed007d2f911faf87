//! Listening sockets: bind, listen, accept with a bounded wait.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::os::fd::AsFd;

use socket2::{SockAddr, SockRef, Socket, Type};
use tracing::{debug, error, warn};

use crate::LISTEN_BACKLOG;
use crate::connect::{Family, socket_addr};
use crate::context::IoContext;
use crate::error::{IoError, SetupError};
use crate::readiness::{Interest, wait_ready};
use crate::sys;
use crate::timeout::Timeout;

fn wildcard(family: Family, port: u16) -> SocketAddr {
    let ip = match family {
        Family::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        Family::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    SocketAddr::new(ip, port)
}

/// Binds `socket` to `ip:port`, or to the family's wildcard address when
/// `ip` is `None` or empty.
pub fn bind<F: AsFd>(
    socket: &F,
    family: Family,
    ip: Option<&str>,
    port: u16,
) -> Result<(), IoError> {
    let addr = match ip.filter(|ip| !ip.is_empty()) {
        Some(ip) => socket_addr(ip, port)?,
        None => wildcard(family, port),
    };

    SockRef::from(socket)
        .bind(&SockAddr::from(addr))
        .map_err(|e| {
            error!(%addr, errno = e.raw_os_error(), error = %e, "bind failed");
            IoError::from(e)
        })
}

/// Creates a listening stream socket on `bind_ip:port`.
///
/// `SO_REUSEADDR` is set before binding; the backlog is
/// [`LISTEN_BACKLOG`]. Port 0 lets the kernel choose.
pub fn listen(family: Family, bind_ip: Option<&str>, port: u16) -> Result<Socket, SetupError> {
    let socket = Socket::new(family.domain(), Type::STREAM, None).map_err(|e| {
        error!(errno = e.raw_os_error(), error = %e, "socket create failed");
        SetupError::Create(e.into())
    })?;

    if let Err(e) = sys::set_nosigpipe(socket.as_fd()) {
        warn!(error = %e, "failed to disable SIGPIPE on socket");
    }

    socket.set_reuse_address(true).map_err(|e| {
        error!(port, error = %e, "setsockopt(SO_REUSEADDR) failed");
        SetupError::Flags(e.into())
    })?;

    bind(&socket, family, bind_ip, port).map_err(SetupError::Bind)?;

    socket.listen(LISTEN_BACKLOG).map_err(|e| {
        error!(port, errno = e.raw_os_error(), error = %e, "listen failed");
        SetupError::Listen(e.into())
    })?;

    debug!(ip = bind_ip.unwrap_or(""), port, "listening");
    Ok(socket)
}

/// Accepts one connection, waiting at most `timeout` for it to arrive.
///
/// An infinite timeout goes straight to `accept(2)`.
pub fn accept_timeout<F: AsFd>(
    listener: &F,
    timeout: Timeout,
    ctx: &IoContext,
) -> Result<(Socket, SocketAddr), IoError> {
    if !timeout.is_infinite() {
        wait_ready(listener.as_fd(), Interest::Readable, timeout, ctx)?;
    }

    let (socket, addr) = loop {
        match SockRef::from(listener).accept() {
            Ok(accepted) => break accepted,
            Err(e) if e.raw_os_error() == Some(libc::EINTR) && ctx.retry_on_interrupt => continue,
            Err(e) => return Err(e.into()),
        }
    };

    let peer = addr
        .as_socket()
        .ok_or_else(|| IoError::InvalidData("accepted a non-inet peer".into()))?;
    Ok((socket, peer))
}
