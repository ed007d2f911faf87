use std::io;
use std::os::fd::BorrowedFd;

pub(crate) const AVAILABLE: bool = false;

pub(crate) fn send_at(
    _socket: BorrowedFd<'_>,
    _file: BorrowedFd<'_>,
    _offset: u64,
    _len: usize,
) -> io::Result<usize> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}
