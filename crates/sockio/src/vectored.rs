//! Scatter/gather transfer over any number of buffers.
//!
//! The kernel accepts at most `IOV_MAX` descriptors per call, so the
//! caller's list is presented through a `Window`: an owned working copy
//! of at most [`batch_cap`] segments. Each segment names a caller buffer by
//! index plus the unconsumed byte range inside it. After a partial
//! transfer the fully consumed segments are dropped, the first partially
//! consumed one is replaced by a trimmed copy, and the window is topped up
//! from the caller's list. Caller buffers are never modified.

use std::io::{IoSlice, IoSliceMut};

use crate::IOV_BATCH_SIZE;
use crate::error::{IoError, TransferError};
use crate::io::{SocketIo, is_interrupted, is_would_block};
use crate::readiness::Interest;
use crate::sys;
use crate::timeout::Timeout;

/// Maximum descriptors handed to one `readv`/`writev`.
pub fn batch_cap() -> usize {
    sys::iov_max()
        .map_or(IOV_BATCH_SIZE, |max| max.min(IOV_BATCH_SIZE))
        .max(1)
}

/// Unconsumed range `[offset, offset + len)` of caller buffer `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    index: usize,
    offset: usize,
    len: usize,
}

#[derive(Debug)]
struct Window {
    segs: Vec<Segment>,
    /// First caller buffer not yet loaded into `segs`.
    next: usize,
    total: usize,
    /// Caller buffers not yet fully consumed.
    remaining: usize,
    cap: usize,
}

impl Window {
    fn new(total: usize, cap: usize) -> Self {
        Self {
            segs: Vec::with_capacity(cap),
            next: 0,
            total,
            remaining: total,
            cap,
        }
    }

    /// Loads caller buffers until the window is full or the list ends.
    /// Empty buffers are consumed on the spot.
    fn refill(&mut self, len_of: impl Fn(usize) -> usize) {
        while self.segs.len() < self.cap && self.next < self.total {
            let len = len_of(self.next);
            if len == 0 {
                self.remaining -= 1;
            } else {
                self.segs.push(Segment {
                    index: self.next,
                    offset: 0,
                    len,
                });
            }
            self.next += 1;
        }
    }

    /// Accounts for `n` transferred bytes and returns how many presented
    /// segments were fully consumed.
    fn advance(&mut self, n: usize) -> usize {
        let mut left = n;
        let mut done = 0;
        for seg in &self.segs {
            if left < seg.len {
                break;
            }
            left -= seg.len;
            done += 1;
        }

        self.segs.drain(..done);
        self.remaining -= done;

        if left > 0
            && let Some(first) = self.segs.first().copied()
        {
            self.segs[0] = Segment {
                offset: first.offset + left,
                len: first.len - left,
                ..first
            };
        }
        done
    }

    fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    fn fill_read(&self, iov: &mut Vec<libc::iovec>, bufs: &mut [IoSliceMut<'_>]) {
        iov.clear();
        for seg in &self.segs {
            let buf: &mut [u8] = &mut bufs[seg.index];
            let part = &mut buf[seg.offset..seg.offset + seg.len];
            iov.push(libc::iovec {
                iov_base: part.as_mut_ptr().cast::<libc::c_void>(),
                iov_len: part.len(),
            });
        }
    }

    fn fill_write(&self, iov: &mut Vec<libc::iovec>, bufs: &[IoSlice<'_>]) {
        iov.clear();
        for seg in &self.segs {
            let buf: &[u8] = &bufs[seg.index];
            let part = &buf[seg.offset..seg.offset + seg.len];
            iov.push(libc::iovec {
                iov_base: part.as_ptr() as *mut libc::c_void,
                iov_len: part.len(),
            });
        }
    }
}

fn check_declared(size: usize, declared: usize) -> Result<(), TransferError> {
    if size != declared {
        tracing::debug!(size, declared, "vector descriptors do not match declared size");
        return Err(TransferError::at_start(IoError::Overflow));
    }
    Ok(())
}

impl SocketIo<'_> {
    /// Reads exactly `size` bytes scattered across `bufs`, in order.
    ///
    /// `size` must equal the summed length of `bufs`; anything else is
    /// [`IoError::Overflow`] before a byte is read. Meant for non-blocking
    /// sockets: the call is issued first and readiness is awaited only
    /// after would-block.
    pub fn readv_nonblocking(
        &self,
        size: usize,
        bufs: &mut [IoSliceMut<'_>],
        timeout: Timeout,
    ) -> Result<usize, TransferError> {
        check_declared(size, bufs.iter().map(|b| b.len()).sum())?;

        let cap = batch_cap();
        let mut window = Window::new(bufs.len(), cap);
        window.refill(|i| bufs[i].len());
        let mut iov = Vec::with_capacity(cap);
        let mut done = 0;

        while done < size {
            if window.is_empty() {
                return Err(TransferError::new(IoError::Overflow, done as u64));
            }
            window.fill_read(&mut iov, bufs);

            match sys::readv(self.fd(), &iov) {
                Ok(0) => return Err(TransferError::new(IoError::NotConnected, done as u64)),
                Ok(n) => {
                    self.after_recv();
                    done += n;
                    if done >= size {
                        break;
                    }
                    window.advance(n);
                    if window.remaining == 0 {
                        return Err(TransferError::new(IoError::Overflow, done as u64));
                    }
                    window.refill(|i| bufs[i].len());
                    continue;
                }
                Err(e) if is_would_block(&e) => {}
                Err(e) if is_interrupted(&e) && self.context().retry_on_interrupt => {}
                Err(e) => return Err(TransferError::new(e.into(), done as u64)),
            }

            self.wait(Interest::Readable, timeout)
                .map_err(|e| TransferError::new(e, done as u64))?;
        }
        Ok(done)
    }

    /// Writes exactly `size` bytes gathered from `bufs`, in order.
    ///
    /// Same contract as [`readv_nonblocking`](Self::readv_nonblocking) in
    /// the other direction.
    pub fn writev_nonblocking(
        &self,
        size: usize,
        bufs: &[IoSlice<'_>],
        timeout: Timeout,
    ) -> Result<usize, TransferError> {
        check_declared(size, bufs.iter().map(|b| b.len()).sum())?;

        let cap = batch_cap();
        let mut window = Window::new(bufs.len(), cap);
        window.refill(|i| bufs[i].len());
        let mut iov = Vec::with_capacity(cap);
        let mut done = 0;

        while done < size {
            if window.is_empty() {
                return Err(TransferError::new(IoError::Overflow, done as u64));
            }
            window.fill_write(&mut iov, bufs);

            match sys::writev(self.fd(), &iov) {
                Ok(0) => return Err(TransferError::new(IoError::NotConnected, done as u64)),
                Ok(n) => {
                    done += n;
                    window.advance(n);
                    if window.remaining == 0 {
                        if done < size {
                            return Err(TransferError::new(IoError::Overflow, done as u64));
                        }
                        break;
                    }
                    window.refill(|i| bufs[i].len());
                    continue;
                }
                Err(e) if is_would_block(&e) => {}
                Err(e) if is_interrupted(&e) && self.context().retry_on_interrupt => {}
                Err(e) => return Err(TransferError::new(e.into(), done as u64)),
            }

            self.wait(Interest::Writable, timeout)
                .map_err(|e| TransferError::new(e, done as u64))?;
        }
        Ok(done)
    }
}
