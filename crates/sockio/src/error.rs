//! Error types for socket I/O.
//!
//! Would-block never shows up here: it is absorbed by the readiness wait.
//! Interruption only shows up when the context disables retrying.

use std::io;

/// Errors produced by the socket primitives.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation timed out")]
    TimedOut,

    #[error("interrupted system call")]
    Interrupted,

    #[error("peer closed the connection")]
    NotConnected,

    #[error("resource exhausted: {0}")]
    ResourceExhausted(io::Error),

    #[error("I/O error: {0}")]
    Os(io::Error),

    #[error("data integrity violation: {0}")]
    InvalidData(String),

    /// Raised by the vectored calls only; an OS `EOVERFLOW` stays [`IoError::Os`].
    #[error("vector descriptors do not cover the requested size")]
    Overflow,
}

impl IoError {
    /// Maps a raw errno value onto the taxonomy.
    pub fn from_errno(code: i32) -> Self {
        match code {
            libc::ETIMEDOUT => IoError::TimedOut,
            libc::EINTR => IoError::Interrupted,
            libc::ENOTCONN => IoError::NotConnected,
            libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM => {
                IoError::ResourceExhausted(io::Error::from_raw_os_error(code))
            }
            _ => IoError::Os(io::Error::from_raw_os_error(code)),
        }
    }

    /// Captures `errno` after a failed libc call.
    pub(crate) fn last_os_error() -> Self {
        io::Error::last_os_error().into()
    }

    /// Returns the classic errno value for this error.
    ///
    /// Errors that carry an OS error return its code unchanged.
    pub fn errno(&self) -> i32 {
        match self {
            IoError::InvalidArgument(_) => libc::EINVAL,
            IoError::TimedOut => libc::ETIMEDOUT,
            IoError::Interrupted => libc::EINTR,
            IoError::NotConnected => libc::ENOTCONN,
            IoError::ResourceExhausted(e) => e.raw_os_error().unwrap_or(libc::EMFILE),
            IoError::Os(e) => e.raw_os_error().unwrap_or(libc::EIO),
            IoError::InvalidData(_) => libc::EINVAL,
            IoError::Overflow => libc::EOVERFLOW,
        }
    }

    /// Returns `true` when the peer went away (orderly or not).
    pub fn is_disconnect(&self) -> bool {
        match self {
            IoError::NotConnected => true,
            IoError::Os(e) => matches!(
                e.raw_os_error(),
                Some(libc::ECONNRESET) | Some(libc::EPIPE) | Some(libc::ECONNABORTED)
            ),
            _ => false,
        }
    }
}

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        if let Some(code) = e.raw_os_error() {
            return IoError::from_errno(code);
        }
        match e.kind() {
            io::ErrorKind::TimedOut => IoError::TimedOut,
            io::ErrorKind::Interrupted => IoError::Interrupted,
            io::ErrorKind::NotConnected | io::ErrorKind::UnexpectedEof => IoError::NotConnected,
            io::ErrorKind::InvalidInput => IoError::InvalidArgument(e.to_string()),
            io::ErrorKind::InvalidData => IoError::InvalidData(e.to_string()),
            _ => IoError::Os(e),
        }
    }
}

/// A failed transfer together with the progress made before the failure.
///
/// Partial progress is never discarded: `transferred` is exact.
#[derive(Debug, thiserror::Error)]
#[error("{kind} (after {transferred} bytes)")]
pub struct TransferError {
    #[source]
    pub kind: IoError,
    pub transferred: u64,
}

impl TransferError {
    pub fn new(kind: IoError, transferred: u64) -> Self {
        Self { kind, transferred }
    }

    /// A failure before any byte moved.
    pub fn at_start(kind: impl Into<IoError>) -> Self {
        Self::new(kind.into(), 0)
    }
}

/// Errors from the create-then-connect and create-then-listen helpers.
///
/// Each variant names the stage that failed; the socket created in the
/// first stage has already been closed.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("socket create failed: {0}")]
    Create(IoError),

    #[error("setting socket flags failed: {0}")]
    Flags(IoError),

    #[error("bind failed: {0}")]
    Bind(IoError),

    #[error("listen failed: {0}")]
    Listen(IoError),

    #[error("connect failed: {0}")]
    Connect(IoError),
}

impl SetupError {
    /// Distinct negative code per stage: create -1, flags -2, bind -3,
    /// connect/listen -4.
    pub fn stage_code(&self) -> i32 {
        match self {
            SetupError::Create(_) => -1,
            SetupError::Flags(_) => -2,
            SetupError::Bind(_) => -3,
            SetupError::Listen(_) | SetupError::Connect(_) => -4,
        }
    }

    /// The underlying error, whatever the stage.
    pub fn cause(&self) -> &IoError {
        match self {
            SetupError::Create(e)
            | SetupError::Flags(e)
            | SetupError::Bind(e)
            | SetupError::Listen(e)
            | SetupError::Connect(e) => e,
        }
    }
}
