//! Runtime switches shared by every component.
//!
//! Components take an [`IoContext`] by value when they are constructed.
//! The process-wide default only seeds new contexts; changing it does not
//! reach handles that already exist.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

static RETRY_ON_INTERRUPT: AtomicBool = AtomicBool::new(true);
static QUICK_ACK: AtomicBool = AtomicBool::new(false);

/// Behavior switches for socket I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IoContext {
    /// Retry a wait or syscall that fails with `EINTR` instead of
    /// surfacing [`IoError::Interrupted`](crate::IoError::Interrupted).
    pub retry_on_interrupt: bool,
    /// Apply `TCP_QUICKACK` after every successful receive (Linux only).
    pub quick_ack: bool,
}

impl Default for IoContext {
    fn default() -> Self {
        Self {
            retry_on_interrupt: true,
            quick_ack: false,
        }
    }
}

impl IoContext {
    /// Snapshot of the process-wide defaults.
    pub fn current() -> Self {
        Self {
            retry_on_interrupt: RETRY_ON_INTERRUPT.load(Ordering::Relaxed),
            quick_ack: QUICK_ACK.load(Ordering::Relaxed),
        }
    }

    /// Replaces the process-wide defaults.
    ///
    /// Meant to be called once at startup.
    pub fn set_global(ctx: IoContext) {
        RETRY_ON_INTERRUPT.store(ctx.retry_on_interrupt, Ordering::Relaxed);
        QUICK_ACK.store(ctx.quick_ack, Ordering::Relaxed);
    }

    pub fn with_retry_on_interrupt(mut self, value: bool) -> Self {
        self.retry_on_interrupt = value;
        self
    }

    pub fn with_quick_ack(mut self, value: bool) -> Self {
        self.quick_ack = value;
        self
    }
}
