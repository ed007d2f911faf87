//! Per-wait timeout values.

use std::time::Duration;

/// Bound on a single wait for readiness.
///
/// The bound is re-armed for every wait inside a multi-step transfer, so
/// the total wall-clock time of a transfer that keeps making progress is
/// not bounded by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// Wait as long as it takes.
    #[default]
    Infinite,
    /// Give up after this long without readiness.
    Bounded(Duration),
}

impl Timeout {
    /// Seconds, where zero or negative means [`Timeout::Infinite`].
    pub fn from_secs(secs: i64) -> Self {
        if secs <= 0 {
            Timeout::Infinite
        } else {
            Timeout::Bounded(Duration::from_secs(secs as u64))
        }
    }

    /// Milliseconds, where zero or negative means [`Timeout::Infinite`].
    pub fn from_millis(millis: i64) -> Self {
        if millis <= 0 {
            Timeout::Infinite
        } else {
            Timeout::Bounded(Duration::from_millis(millis as u64))
        }
    }

    /// The `poll(2)` timeout argument: `-1` for infinite, otherwise
    /// milliseconds saturated to `c_int`. Sub-millisecond bounds round up
    /// so a bounded wait never turns into a non-blocking probe.
    pub fn as_poll_millis(&self) -> libc::c_int {
        match self {
            Timeout::Infinite => -1,
            Timeout::Bounded(d) => {
                let mut ms = d.as_millis();
                if ms == 0 && !d.is_zero() {
                    ms = 1;
                }
                ms.min(libc::c_int::MAX as u128) as libc::c_int
            }
        }
    }

    /// The bound as a `Duration`, `None` when infinite.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Timeout::Infinite => None,
            Timeout::Bounded(d) => Some(*d),
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Timeout::Infinite)
    }
}

/// A zero duration means [`Timeout::Infinite`], like `from_secs(0)`.
impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        if d.is_zero() {
            Timeout::Infinite
        } else {
            Timeout::Bounded(d)
        }
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(d: Option<Duration>) -> Self {
        d.map_or(Timeout::Infinite, Timeout::from)
    }
}
