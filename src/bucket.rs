//! The bucket: refill, decide, publish.
//!
//! Every operation follows the same step: read the current snapshot, refill it up to the
//! clock reading taken at the start of the call, evaluate the request, then hand the
//! result to the storage. A grant must replace exactly the snapshot it was computed from;
//! a denial publishes the refreshed snapshot on a best-effort basis so other callers keep
//! observing refill progress.
//!
//! Semantics:
//! - `try_consume` never blocks.
//! - `consume` retries until the deadline, pausing through the configured [`Waiter`]
//!   for the estimated refill time (never past the deadline).
//! - `consume_async` does the same through the configured [`Sleeper`].
//! - Requests larger than the configuration can ever admit are capped, or rejected with
//!   [`BucketError::Unsatisfiable`] when the bucket was built with
//!   `reject_oversized_requests()`.
//!
//! [`Waiter`]: crate::Waiter
//! [`Sleeper`]: crate::Sleeper

use crate::admission::{decide, effective_request, Admission};
use crate::config::BucketConfiguration;
use crate::error::BucketError;
use crate::state::BucketState;
use crate::storage::{AtomicStorage, LocalStorage, StateStorage, Transition};
use std::sync::Arc;
use std::time::Duration;

/// Bucket that may be shared by any number of threads.
pub type SharedBucket = Bucket<AtomicStorage>;

/// Bucket for one owner at a time. Same behavior as [`SharedBucket`], without the
/// compare-and-swap.
pub type LocalBucket = Bucket<LocalStorage>;

/// Token bucket enforcing every configured bandwidth at once.
///
/// ```
/// use bandwidth_limiter::{BucketBuilder, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let bucket = BucketBuilder::new()
///     .with_limited_bandwidth(10, Duration::from_secs(1))
///     .with_clock(clock.clone())
///     .build()
///     .unwrap();
///
/// assert!(bucket.try_consume(10).unwrap());
/// assert!(!bucket.try_consume(1).unwrap());
/// clock.advance(Duration::from_millis(100));
/// assert!(bucket.try_consume(1).unwrap());
/// ```
#[derive(Debug)]
pub struct Bucket<S = AtomicStorage> {
    config: Arc<BucketConfiguration>,
    storage: S,
}

/// Result of a single non-blocking attempt.
enum Attempt {
    Granted,
    Denied { wait_nanos: i64 },
}

/// What a waiting consumer does next.
enum Step {
    Done,
    Expired,
    Wait(Duration),
}

impl<S: StateStorage> Bucket<S> {
    /// Create a bucket with every bandwidth at its initial capacity.
    pub fn new(config: BucketConfiguration) -> Self {
        Self::with_shared_configuration(Arc::new(config))
    }

    /// Create a bucket over a configuration shared with other buckets.
    pub fn with_shared_configuration(config: Arc<BucketConfiguration>) -> Self {
        let now = config.clock().now_nanos();
        let storage = S::with_state(BucketState::initial(&config, now));
        Self { config, storage }
    }

    pub fn configuration(&self) -> &BucketConfiguration {
        &self.config
    }

    /// Try to take `tokens` without waiting.
    ///
    /// Returns `Ok(false)` when the bucket cannot serve the request right now.
    pub fn try_consume(&self, tokens: u64) -> Result<bool, BucketError> {
        let tokens = effective_request(&self.config, tokens)?;
        let now = self.config.clock().now_nanos();
        Ok(matches!(self.attempt(tokens, now), Attempt::Granted))
    }

    /// Take `tokens`, waiting up to `timeout` for them to refill.
    ///
    /// `None` waits indefinitely; `Some(Duration::ZERO)` makes a single attempt. The
    /// deadline is measured on the bucket's clock. Returns `Ok(false)` if the deadline
    /// passes first.
    pub fn consume(&self, tokens: u64, timeout: Option<Duration>) -> Result<bool, BucketError> {
        let tokens = effective_request(&self.config, tokens)?;
        let deadline = self.deadline(timeout);
        loop {
            match self.step(tokens, deadline) {
                Step::Done => return Ok(true),
                Step::Expired => return Ok(false),
                Step::Wait(wait) => self.config.waiter().wait(wait),
            }
        }
    }

    /// Async form of [`consume`](Self::consume); waits through the configured sleeper
    /// instead of blocking the thread.
    pub async fn consume_async(
        &self,
        tokens: u64,
        timeout: Option<Duration>,
    ) -> Result<bool, BucketError> {
        let tokens = effective_request(&self.config, tokens)?;
        let deadline = self.deadline(timeout);
        loop {
            match self.step(tokens, deadline) {
                Step::Done => return Ok(true),
                Step::Expired => return Ok(false),
                Step::Wait(wait) => self.config.sleeper().sleep(wait).await,
            }
        }
    }

    /// Tokens available at `index` (slot order: guaranteed first, then limited), after
    /// refilling to now. Publishes the refreshed snapshot but never debits.
    pub fn available_tokens(&self, index: usize) -> Option<f64> {
        self.refreshed().available(index)
    }

    /// Refreshed copy of the whole snapshot, published like [`available_tokens`](Self::available_tokens).
    pub fn snapshot(&self) -> BucketState {
        self.refreshed()
    }

    fn refreshed(&self) -> BucketState {
        let now = self.config.clock().now_nanos();
        self.storage.transition(|current| {
            let refilled = current.refilled(&self.config, now);
            Transition::Refresh(refilled.clone(), refilled)
        })
    }

    fn attempt(&self, tokens: u64, now: i64) -> Attempt {
        let attempt = self.storage.transition(|current| {
            let refilled = current.refilled(&self.config, now);
            match decide(&refilled, &self.config, tokens, now) {
                Admission::Granted(next) => Transition::Commit(next, Attempt::Granted),
                Admission::Denied { wait_nanos } => {
                    Transition::Refresh(refilled, Attempt::Denied { wait_nanos })
                }
            }
        });
        if let Attempt::Denied { wait_nanos } = attempt {
            tracing::trace!(requested = tokens, wait_nanos, "bucket: request denied");
        }
        attempt
    }

    /// One attempt, then how long to pause before the next one, never past `deadline`.
    fn step(&self, tokens: u64, deadline: Option<i64>) -> Step {
        let now = self.config.clock().now_nanos();
        let wait_nanos = match self.attempt(tokens, now) {
            Attempt::Granted => return Step::Done,
            Attempt::Denied { wait_nanos } => wait_nanos.max(1),
        };

        let wait_nanos = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_sub(now);
                if remaining <= 0 {
                    tracing::debug!(
                        requested = tokens,
                        "bucket: deadline passed before tokens refilled"
                    );
                    return Step::Expired;
                }
                wait_nanos.min(remaining)
            }
            None => wait_nanos,
        };
        Step::Wait(Duration::from_nanos(u64::try_from(wait_nanos).unwrap_or(1)))
    }

    fn deadline(&self, timeout: Option<Duration>) -> Option<i64> {
        timeout.map(|t| {
            let timeout = i64::try_from(t.as_nanos()).unwrap_or(i64::MAX);
            self.config.clock().now_nanos().saturating_add(timeout)
        })
    }
}
