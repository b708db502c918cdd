//! Timestamp and clock types used throughout the poll.
//!
//! Timestamps are Unix epoch milliseconds (UTC). Cooldown decisions compare
//! timestamps taken from the same [`Clock`], so correctness under wall-clock
//! adjustment depends on the clock being monotonic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in milliseconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Current system time. A clock set before the epoch reads as [`Timestamp::EPOCH`].
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Earliest timestamp that still lies inside the window `(self - window_ms, self]`.
    ///
    /// A record at `t` is inside the window iff `t > self - window_ms`, i.e.
    /// `t >= window_start(window_ms)`. When the window reaches back before the
    /// epoch every timestamp qualifies.
    pub fn window_start(&self, window_ms: u64) -> Timestamp {
        match self.0.checked_sub(window_ms) {
            Some(cutoff) => Timestamp(cutoff.saturating_add(1)),
            None => Timestamp::EPOCH,
        }
    }

    /// Whether `self` lies inside the window of `window_ms` ending at `now`.
    pub fn is_within(&self, window_ms: u64, now: Timestamp) -> bool {
        *self >= now.window_start(window_ms)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of the current time.
///
/// The ledger stamps records with it and the admission policy evaluates the
/// cooldown with it; both must share one instance.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by [`SystemTime`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
