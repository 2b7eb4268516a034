//! Time sources
//!
//! The engine never reads the wall clock directly. It asks a [`TimeSource`],
//! which must be monotonically non-decreasing; the accumulator rejects any
//! timestamp older than its last sync.

use crate::types::{Seconds, Timestamp};

/// Provider of the current timestamp
pub trait TimeSource: Send + Sync {
    /// Current unix time in seconds
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp()
    }
}

/// Manually driven clock for simulations and tests
pub struct ManualClock {
    now: parking_lot::Mutex<Timestamp>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: parking_lot::Mutex::new(start),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, secs: Seconds) -> Timestamp {
        let mut now = self.now.lock();
        *now = now.saturating_add(secs as Timestamp);
        *now
    }

    /// Jump to `timestamp`; ignored if it would move time backwards
    pub fn set(&self, timestamp: Timestamp) -> Timestamp {
        let mut now = self.now.lock();
        *now = (*now).max(timestamp);
        *now
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Seconds elapsed from `earlier` to `now`, zero if `now` is not later
pub fn elapsed_secs(earlier: Timestamp, now: Timestamp) -> Seconds {
    now.saturating_sub(earlier).max(0) as Seconds
}
