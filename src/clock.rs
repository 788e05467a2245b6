//! Clock abstractions feeding elapsed time into the refill engine.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Clock abstraction so timing can be faked in tests.
///
/// Readings only need to be monotonic relative to each other; the absolute origin is
/// irrelevant because buckets only ever look at differences.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_nanos(&self) -> i64;
}

/// Monotonic clock backed by `Instant::now()`.
///
/// Notes: readings are relative to the moment the clock was created and reset when the
/// process restarts.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock for MonotonicClock {
    fn now_nanos(&self) -> i64 {
        i64::try_from(self.start.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }
}

/// Manually driven clock for deterministic tests.
///
/// Clones share the same reading, so a test can hand one clone to a bucket and keep
/// another to move time forward.
///
/// ```
/// use bandwidth_limiter::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// clock.advance(Duration::from_millis(5));
/// assert_eq!(clock.now_nanos(), 5_000_000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock starting at `nanos`.
    pub fn starting_at(nanos: i64) -> Self {
        Self { now: Arc::new(AtomicI64::new(nanos)) }
    }

    /// Move time forward by `by`, saturating at `i64::MAX` nanoseconds.
    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_nanos()).unwrap_or(i64::MAX);
        let _ = self.now.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
            Some(cur.saturating_add(delta))
        });
    }

    /// Jump to an absolute reading. Moving backwards is allowed so tests can simulate
    /// clock regression.
    pub fn set(&self, nanos: i64) {
        self.now.store(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
