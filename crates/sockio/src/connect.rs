//! Connection establishment.
//!
//! Textual addresses are parsed here; name resolution is the caller's job.
//! [`connect_timeout`] is the workhorse: it temporarily switches a blocking
//! socket to non-blocking, waits for the handshake with a bound, and reads
//! the pending socket error to learn the outcome.

use std::net::{IpAddr, SocketAddr};
use std::os::fd::{AsFd, BorrowedFd};

use socket2::{Domain, SockAddr, SockRef, Socket, Type};
use tracing::{debug, error, warn};

use crate::context::IoContext;
use crate::error::{IoError, SetupError};
use crate::listen::bind;
use crate::readiness::{Interest, Readiness, wait};
use crate::sys;
use crate::timeout::Timeout;

/// Address family of a stream socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Guesses the family from a textual address: anything with a colon
    /// is IPv6.
    pub fn for_ip(ip: &str) -> Family {
        if ip.contains(':') {
            Family::V6
        } else {
            Family::V4
        }
    }

    pub(crate) fn domain(self) -> Domain {
        match self {
            Family::V4 => Domain::IPV4,
            Family::V6 => Domain::IPV6,
        }
    }
}

/// Outcome of [`connect_async`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Connected,
    /// The handshake is running; wait for writability to learn the result.
    InProgress,
}

/// Parses a textual IPv4/IPv6 address plus port.
///
/// IPv6 literals may be bracketed.
pub fn socket_addr(ip: &str, port: u16) -> Result<SocketAddr, IoError> {
    let literal = ip.trim().trim_start_matches('[').trim_end_matches(']');
    match literal.parse::<IpAddr>() {
        Ok(addr) => Ok(SocketAddr::new(addr, port)),
        Err(_) => {
            let family = match Family::for_ip(literal) {
                Family::V4 => "IPv4",
                Family::V6 => "IPv6",
            };
            warn!(ip, family, "invalid ip address");
            Err(IoError::InvalidArgument(format!("invalid {family} address: {ip}")))
        }
    }
}

/// Blocking connect.
pub fn connect<F: AsFd>(socket: &F, ip: &str, port: u16) -> Result<(), IoError> {
    let addr = SockAddr::from(socket_addr(ip, port)?);
    SockRef::from(socket).connect(&addr)?;
    Ok(())
}

/// Issues the connect and returns without waiting.
pub fn connect_async<F: AsFd>(
    socket: &F,
    ip: &str,
    port: u16,
) -> Result<ConnectState, IoError> {
    let addr = SockAddr::from(socket_addr(ip, port)?);
    match SockRef::from(socket).connect(&addr) {
        Ok(()) => Ok(ConnectState::Connected),
        Err(e) if e.raw_os_error() == Some(libc::EINPROGRESS) => Ok(ConnectState::InProgress),
        Err(e) => Err(e.into()),
    }
}

/// Restores a descriptor's status flags when dropped.
struct RestoreFlags<'fd> {
    fd: BorrowedFd<'fd>,
    flags: libc::c_int,
}

impl Drop for RestoreFlags<'_> {
    fn drop(&mut self) {
        if let Err(e) = sys::set_status_flags(self.fd, self.flags) {
            warn!(error = %e, "failed to restore socket flags after connect");
        }
    }
}

/// Connects with a bounded wait for the handshake.
///
/// With `auto_detect`, a blocking socket is switched to non-blocking for
/// the duration of the call and switched back afterwards whatever the
/// outcome. Without it the socket is used as is, so a blocking socket
/// simply blocks in `connect(2)`.
pub fn connect_timeout<F: AsFd>(
    socket: &F,
    ip: &str,
    port: u16,
    timeout: Timeout,
    auto_detect: bool,
    ctx: &IoContext,
) -> Result<(), IoError> {
    let addr = SockAddr::from(socket_addr(ip, port)?);
    let fd = socket.as_fd();

    let _restore = if auto_detect {
        let flags = sys::status_flags(fd)?;
        if flags & libc::O_NONBLOCK == 0 {
            sys::set_status_flags(fd, flags | libc::O_NONBLOCK)?;
            Some(RestoreFlags { fd, flags })
        } else {
            None
        }
    } else {
        None
    };

    match SockRef::from(&fd).connect(&addr) {
        Ok(()) => return Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EINPROGRESS) => {}
        Err(e) => return Err(e.into()),
    }

    loop {
        match wait(fd, Interest::Either, timeout)? {
            Readiness::Ready | Readiness::PeerError => break,
            Readiness::TimedOut => return Err(IoError::TimedOut),
            Readiness::Interrupted if ctx.retry_on_interrupt => continue,
            Readiness::Interrupted => return Err(IoError::Interrupted),
        }
    }

    match SockRef::from(&fd).take_error()? {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Parameters for [`create_socket`] and [`connect_to`].
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Family to create; guessed from the server address when `None`.
    pub family: Option<Family>,
    /// Extra file status flags OR-ed in with `F_SETFL` after creation,
    /// e.g. `libc::O_NONBLOCK`. Zero leaves the flags alone.
    pub flags: libc::c_int,
    /// Local address to bind before connecting (port 0).
    pub bind_ip: Option<String>,
    pub timeout: Timeout,
    pub context: IoContext,
}

impl ConnectOptions {
    /// Whether the extra flags leave the socket non-blocking.
    pub fn is_nonblocking(&self) -> bool {
        self.flags & libc::O_NONBLOCK != 0
    }
}

/// Creates a stream socket ready to connect to `server_ip`.
///
/// Close-on-exec is always set and `SIGPIPE` suppressed where the platform
/// has a socket option for it.
pub fn create_socket(server_ip: &str, opts: &ConnectOptions) -> Result<Socket, SetupError> {
    let family = opts.family.unwrap_or_else(|| Family::for_ip(server_ip));

    let socket = Socket::new(family.domain(), Type::STREAM, None).map_err(|e| {
        error!(errno = e.raw_os_error(), error = %e, "socket create failed");
        SetupError::Create(e.into())
    })?;

    if let Err(e) = sys::set_nosigpipe(socket.as_fd()) {
        warn!(error = %e, "failed to disable SIGPIPE on socket");
    }

    if opts.flags != 0 {
        add_status_flags(socket.as_fd(), opts.flags).map_err(|e| {
            error!(flags = opts.flags, error = %e, "fcntl(F_SETFL) failed");
            SetupError::Flags(e)
        })?;
    }

    if let Some(ip) = opts.bind_ip.as_deref().filter(|ip| !ip.is_empty()) {
        bind(&socket, family, Some(ip), 0).map_err(SetupError::Bind)?;
    }

    Ok(socket)
}

fn add_status_flags(fd: BorrowedFd<'_>, extra: libc::c_int) -> Result<(), IoError> {
    let flags = sys::status_flags(fd)?;
    if flags | extra != flags {
        sys::set_status_flags(fd, flags | extra)?;
    }
    Ok(())
}

/// Creates a socket and connects it to `server_ip:port`.
///
/// Blocking vs. non-blocking handling follows `O_NONBLOCK` in `opts.flags`. On any
/// failure the socket is closed and the stage is reported.
pub fn connect_to(server_ip: &str, port: u16, opts: &ConnectOptions) -> Result<Socket, SetupError> {
    let socket = create_socket(server_ip, opts)?;

    let auto_detect = !opts.is_nonblocking();
    connect_timeout(
        &socket,
        server_ip,
        port,
        opts.timeout,
        auto_detect,
        &opts.context,
    )
    .map_err(|e| {
        error!(
            server = server_ip,
            port,
            errno = e.errno(),
            error = %e,
            "connect failed"
        );
        SetupError::Connect(e)
    })?;

    debug!(server = server_ip, port, "connected");
    Ok(socket)
}
