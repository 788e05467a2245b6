//! Waiting strategies for callers that cannot be served immediately.
//!
//! Blocking callers go through a [`Waiter`]; async callers go through a [`Sleeper`]. The
//! bucket never asks either to wait past the caller's deadline, and re-checks the bucket
//! after every wait, so early or spurious wakeups are harmless.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Blocks the calling thread for roughly `duration`.
pub trait Waiter: Send + Sync + std::fmt::Debug {
    fn wait(&self, duration: Duration);
}

/// Suspends the thread with `thread::park_timeout`. Lowest CPU cost; wakeup latency is
/// up to the scheduler. An `unpark` on the thread ends the wait early.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParkingWaiter;

impl Waiter for ParkingWaiter {
    fn wait(&self, duration: Duration) {
        std::thread::park_timeout(duration);
    }
}

/// Busy-waits with a spin hint. Lowest latency, burns a core while waiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinningWaiter;

impl Waiter for SpinningWaiter {
    fn wait(&self, duration: Duration) {
        let until = Instant::now() + duration;
        while Instant::now() < until {
            std::hint::spin_loop();
        }
    }
}

/// Yields to the scheduler until the duration has passed.
#[derive(Debug, Default, Clone, Copy)]
pub struct YieldingWaiter;

impl Waiter for YieldingWaiter {
    fn wait(&self, duration: Duration) {
        let until = Instant::now() + duration;
        while Instant::now() < until {
            std::thread::yield_now();
        }
    }
}

/// Built-in waiter selector, usable from settings files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WaitingStrategy {
    #[default]
    Parking,
    Spinning,
    Yielding,
}

impl WaitingStrategy {
    /// Instantiate the selected waiter.
    pub fn waiter(self) -> Arc<dyn Waiter> {
        match self {
            WaitingStrategy::Parking => Arc::new(ParkingWaiter),
            WaitingStrategy::Spinning => Arc::new(SpinningWaiter),
            WaitingStrategy::Yielding => Arc::new(YieldingWaiter),
        }
    }
}

/// How [`Bucket::consume_async`](crate::Bucket::consume_async) pauses between attempts.
///
/// The bucket passes the refill estimate, already clamped to the caller's deadline. Each
/// returned future is polled to completion before the next attempt, so an implementation
/// only has to delay; it never needs to signal or cancel anything.
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Default async pause for buckets: a tokio timer, so waiting tasks yield their worker
/// thread while tokens refill. Needs a tokio runtime with the time driver enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Pause that completes at once, for tests. Time only passes if something else moves the
/// bucket's clock, so against a frozen [`ManualClock`](crate::ManualClock) use it with a
/// zero timeout or with requests that succeed without waiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async {})
    }
}
