//! Zero-copy file-to-socket transfer, one implementation per platform.
//!
//! `send_at` moves up to `len` bytes starting at file offset `offset` and
//! returns how many went out. A partial count is a success; the caller
//! loops.

#[cfg(any(target_os = "linux", target_os = "android"))]
#[path = "linux.rs"]
mod platform;

#[cfg(any(target_os = "macos", target_os = "ios"))]
#[path = "apple.rs"]
mod platform;

#[cfg(target_os = "freebsd")]
#[path = "freebsd.rs"]
mod platform;

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd"
)))]
#[path = "unsupported.rs"]
mod platform;

pub(crate) use platform::{AVAILABLE, send_at};
