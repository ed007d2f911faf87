//! Scalar timed send/receive.
//!
//! Two strategies per direction. The blocking one waits for readiness
//! before every syscall; the non-blocking one calls first and only waits
//! when the kernel says it would block. Both loop until the whole buffer
//! moved, the peer went away, or a wait failed, and both report the exact
//! byte count on failure.

use std::io;
use std::os::fd::{AsFd, BorrowedFd};

use tracing::error;

use crate::context::IoContext;
use crate::error::{IoError, TransferError};
use crate::readiness::{Interest, wait_ready};
use crate::sys;
use crate::timeout::Timeout;

/// Blocking mode of a descriptor, read from its status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Blocking,
    NonBlocking,
}

impl Mode {
    pub fn of(fd: BorrowedFd<'_>) -> Result<Mode, IoError> {
        let flags = sys::status_flags(fd)?;
        if flags & libc::O_NONBLOCK != 0 {
            Ok(Mode::NonBlocking)
        } else {
            Ok(Mode::Blocking)
        }
    }
}

/// Puts a socket into non-blocking mode.
pub fn set_nonblocking<F: AsFd + ?Sized>(socket: &F) -> Result<(), IoError> {
    let fd = socket.as_fd();
    let flags = sys::status_flags(fd).inspect_err(|e| error!(error = %e, "fcntl(F_GETFL) failed"))?;
    if flags & libc::O_NONBLOCK == 0 {
        sys::set_status_flags(fd, flags | libc::O_NONBLOCK)
            .inspect_err(|e| error!(error = %e, "fcntl(F_SETFL) failed"))?;
    }
    Ok(())
}

pub(crate) fn is_would_block(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
}

pub(crate) fn is_interrupted(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EINTR)
}

/// A borrowed socket plus the switches its operations run under.
///
/// Cheap to build; make one per call site or keep one per connection.
#[derive(Debug, Clone, Copy)]
pub struct SocketIo<'fd> {
    fd: BorrowedFd<'fd>,
    ctx: IoContext,
}

impl<'fd> SocketIo<'fd> {
    /// Wraps `socket` with the process-wide [`IoContext::current`].
    pub fn new<F: AsFd + ?Sized>(socket: &'fd F) -> Self {
        Self {
            fd: socket.as_fd(),
            ctx: IoContext::current(),
        }
    }

    pub fn with_context(mut self, ctx: IoContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn fd(&self) -> BorrowedFd<'fd> {
        self.fd
    }

    pub fn context(&self) -> &IoContext {
        &self.ctx
    }

    pub fn mode(&self) -> Result<Mode, IoError> {
        Mode::of(self.fd)
    }

    pub(crate) fn wait(&self, interest: Interest, timeout: Timeout) -> Result<(), IoError> {
        wait_ready(self.fd, interest, timeout, &self.ctx)
    }

    /// Re-arms `TCP_QUICKACK` when enabled. Failures are ignored: the hint
    /// only affects latency.
    pub(crate) fn after_recv(&self) {
        if self.ctx.quick_ack {
            let _ = sys::quick_ack(self.fd);
        }
    }

    /// Fills `buf`, picking the strategy from the socket's current mode.
    pub fn recv(&self, buf: &mut [u8], timeout: Timeout) -> Result<usize, TransferError> {
        match self.mode().map_err(TransferError::at_start)? {
            Mode::Blocking => self.recv_blocking(buf, timeout),
            Mode::NonBlocking => self.recv_nonblocking(buf, timeout),
        }
    }

    /// Sends all of `buf`, picking the strategy from the socket's current mode.
    pub fn send(&self, buf: &[u8], timeout: Timeout) -> Result<usize, TransferError> {
        match self.mode().map_err(TransferError::at_start)? {
            Mode::Blocking => self.send_blocking(buf, timeout),
            Mode::NonBlocking => self.send_nonblocking(buf, timeout),
        }
    }

    /// Wait-then-receive until `buf` is full.
    pub fn recv_blocking(&self, buf: &mut [u8], timeout: Timeout) -> Result<usize, TransferError> {
        let mut done = 0;
        while done < buf.len() {
            self.wait(Interest::Readable, timeout)
                .map_err(|e| TransferError::new(e, done as u64))?;

            match sys::recv(self.fd, &mut buf[done..]) {
                Ok(0) => return Err(TransferError::new(IoError::NotConnected, done as u64)),
                Ok(n) => {
                    self.after_recv();
                    done += n;
                }
                Err(e) if is_would_block(&e) => continue,
                Err(e) if is_interrupted(&e) && self.ctx.retry_on_interrupt => continue,
                Err(e) => return Err(TransferError::new(e.into(), done as u64)),
            }
        }
        Ok(done)
    }

    /// Wait-then-send until all of `buf` is out.
    pub fn send_blocking(&self, buf: &[u8], timeout: Timeout) -> Result<usize, TransferError> {
        let mut done = 0;
        while done < buf.len() {
            self.wait(Interest::Writable, timeout)
                .map_err(|e| TransferError::new(e, done as u64))?;

            match sys::send(self.fd, &buf[done..]) {
                Ok(0) => return Err(TransferError::new(IoError::NotConnected, done as u64)),
                Ok(n) => done += n,
                Err(e) if is_would_block(&e) => continue,
                Err(e) if is_interrupted(&e) && self.ctx.retry_on_interrupt => continue,
                Err(e) => return Err(TransferError::new(e.into(), done as u64)),
            }
        }
        Ok(done)
    }

    /// Receive-first; waits only after the kernel reports would-block.
    pub fn recv_nonblocking(
        &self,
        buf: &mut [u8],
        timeout: Timeout,
    ) -> Result<usize, TransferError> {
        let mut done = 0;
        while done < buf.len() {
            match sys::recv(self.fd, &mut buf[done..]) {
                Ok(0) => return Err(TransferError::new(IoError::NotConnected, done as u64)),
                Ok(n) => {
                    self.after_recv();
                    done += n;
                    continue;
                }
                Err(e) if is_would_block(&e) => {}
                Err(e) if is_interrupted(&e) && self.ctx.retry_on_interrupt => {}
                Err(e) => return Err(TransferError::new(e.into(), done as u64)),
            }

            self.wait(Interest::Readable, timeout)
                .map_err(|e| TransferError::new(e, done as u64))?;
        }
        Ok(done)
    }

    /// Send-first; waits only after the kernel reports would-block.
    pub fn send_nonblocking(&self, buf: &[u8], timeout: Timeout) -> Result<usize, TransferError> {
        let mut done = 0;
        while done < buf.len() {
            match sys::send(self.fd, &buf[done..]) {
                Ok(0) => return Err(TransferError::new(IoError::NotConnected, done as u64)),
                Ok(n) => {
                    done += n;
                    continue;
                }
                Err(e) if is_would_block(&e) => {}
                Err(e) if is_interrupted(&e) && self.ctx.retry_on_interrupt => {}
                Err(e) => return Err(TransferError::new(e.into(), done as u64)),
            }

            self.wait(Interest::Writable, timeout)
                .map_err(|e| TransferError::new(e, done as u64))?;
        }
        Ok(done)
    }
}
