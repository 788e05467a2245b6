//! Bucket configuration and the fluent builder that assembles it.
//!
//! A [`BucketConfiguration`] is immutable once built and shared by every operation on a
//! bucket. Bandwidths are stored in slot order: the guaranteed bandwidth (if any) first,
//! then the limited bandwidths in the order they were added.
//!
//! Example
//! ```rust
//! use bandwidth_limiter::{BucketBuilder, RefillStrategy};
//! use std::time::Duration;
//!
//! let bucket = BucketBuilder::new()
//!     .with_guaranteed_bandwidth(5, Duration::from_secs(1))
//!     .with_limited_bandwidth(100, Duration::from_secs(60))
//!     .with_limited_bandwidth(10, Duration::from_secs(1))
//!     .with_refill_strategy(RefillStrategy::Monotone)
//!     .reject_oversized_requests()
//!     .build()
//!     .unwrap();
//! assert_eq!(bucket.configuration().bandwidths().len(), 3);
//! ```

use crate::bandwidth::Bandwidth;
use crate::bucket::{LocalBucket, SharedBucket};
use crate::clock::{Clock, MonotonicClock};
use crate::error::ConfigError;
use crate::refill::RefillStrategy;
use crate::waiting::{ParkingWaiter, Sleeper, TokioSleeper, Waiter, WaitingStrategy};
use std::sync::Arc;
use std::time::Duration;

/// Immutable configuration shared by all callers of one bucket.
#[derive(Debug, Clone)]
pub struct BucketConfiguration {
    bandwidths: Vec<Bandwidth>,
    has_guaranteed: bool,
    reject_oversized: bool,
    refill_strategy: RefillStrategy,
    waiter: Arc<dyn Waiter>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl BucketConfiguration {
    /// All bandwidths in slot order.
    pub fn bandwidths(&self) -> &[Bandwidth] {
        &self.bandwidths
    }

    /// The guaranteed bandwidth, always slot `0` when present.
    pub fn guaranteed(&self) -> Option<&Bandwidth> {
        if self.has_guaranteed {
            self.bandwidths.first()
        } else {
            None
        }
    }

    /// The limited bandwidths, in insertion order.
    pub fn limited(&self) -> &[Bandwidth] {
        &self.bandwidths[self.limited_offset()..]
    }

    /// Index of the first limited slot.
    pub(crate) fn limited_offset(&self) -> usize {
        usize::from(self.has_guaranteed)
    }

    /// Whether oversized requests fail instead of being capped.
    pub fn rejects_oversized_requests(&self) -> bool {
        self.reject_oversized
    }

    pub fn refill_strategy(&self) -> RefillStrategy {
        self.refill_strategy
    }

    pub fn waiter(&self) -> &dyn Waiter {
        self.waiter.as_ref()
    }

    pub fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Largest request the limited path can ever admit: the smallest limited capacity.
    /// `None` when there are no limited bandwidths, in which case the limited path never
    /// blocks.
    pub fn limited_ceiling(&self) -> Option<u64> {
        self.limited().iter().map(Bandwidth::capacity).min()
    }

    /// Largest request that can ever be admitted, `None` if unbounded.
    pub fn max_satisfiable(&self) -> Option<u64> {
        let ceiling = self.limited_ceiling()?;
        let floor = self.guaranteed().map_or(0, Bandwidth::capacity);
        Some(ceiling.max(floor))
    }
}

/// Plain-data form of a configuration, suitable for loading from config files.
///
/// Clock, waiter and sleeper are runtime handles and are set on the builder afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BucketSettings {
    pub guaranteed: Option<Bandwidth>,
    pub limited: Vec<Bandwidth>,
    pub reject_oversized_requests: bool,
    pub refill_strategy: RefillStrategy,
    pub waiting_strategy: WaitingStrategy,
}

/// Builder for [`BucketConfiguration`] and the buckets built on it.
///
/// Invalid input is remembered and reported by the `build*` methods, so chains never
/// panic halfway.
pub struct BucketBuilder {
    guaranteed: Option<Bandwidth>,
    limited: Vec<Bandwidth>,
    reject_oversized: bool,
    refill_strategy: RefillStrategy,
    waiter: Arc<dyn Waiter>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    error: Option<ConfigError>,
}

impl Default for BucketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BucketBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketBuilder")
            .field("guaranteed", &self.guaranteed)
            .field("limited", &self.limited)
            .field("reject_oversized", &self.reject_oversized)
            .field("refill_strategy", &self.refill_strategy)
            .field("waiter", &self.waiter)
            .field("error", &self.error)
            .finish()
    }
}

impl BucketBuilder {
    /// Create a builder with defaults: monotone refill, parking waiter, monotonic clock,
    /// tokio sleeper, oversized requests capped.
    pub fn new() -> Self {
        Self {
            guaranteed: None,
            limited: Vec::with_capacity(1),
            reject_oversized: false,
            refill_strategy: RefillStrategy::default(),
            waiter: Arc::new(ParkingWaiter),
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(MonotonicClock::default()),
            error: None,
        }
    }

    /// Start from deserialized settings.
    pub fn from_settings(settings: BucketSettings) -> Self {
        let mut builder = Self::new()
            .with_refill_strategy(settings.refill_strategy)
            .with_waiting_strategy(settings.waiting_strategy);
        if let Some(guaranteed) = settings.guaranteed {
            builder = builder.with_guaranteed(guaranteed);
        }
        for limited in settings.limited {
            builder = builder.with_limited(limited);
        }
        if settings.reject_oversized_requests {
            builder = builder.reject_oversized_requests();
        }
        builder
    }

    /// Guaranteed bandwidth that starts full.
    pub fn with_guaranteed_bandwidth(self, capacity: u64, period: Duration) -> Self {
        self.with_guaranteed_bandwidth_and_initial(capacity, period, capacity)
    }

    /// Guaranteed bandwidth starting with `initial` tokens.
    pub fn with_guaranteed_bandwidth_and_initial(
        self,
        capacity: u64,
        period: Duration,
        initial: u64,
    ) -> Self {
        match Bandwidth::with_initial_capacity(capacity, period, initial) {
            Ok(bw) => self.with_guaranteed(bw),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Set the guaranteed bandwidth. Supplying a second one is a configuration error.
    pub fn with_guaranteed(mut self, bandwidth: Bandwidth) -> Self {
        if self.guaranteed.is_some() {
            return self.fail(ConfigError::MultipleGuaranteedBandwidths);
        }
        self.guaranteed = Some(bandwidth);
        self
    }

    /// Limited bandwidth that starts full.
    pub fn with_limited_bandwidth(self, capacity: u64, period: Duration) -> Self {
        self.with_limited_bandwidth_and_initial(capacity, period, capacity)
    }

    /// Limited bandwidth starting with `initial` tokens.
    pub fn with_limited_bandwidth_and_initial(
        self,
        capacity: u64,
        period: Duration,
        initial: u64,
    ) -> Self {
        match Bandwidth::with_initial_capacity(capacity, period, initial) {
            Ok(bw) => self.with_limited(bw),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Add a limited bandwidth.
    pub fn with_limited(mut self, bandwidth: Bandwidth) -> Self {
        self.limited.push(bandwidth);
        self
    }

    /// Override the clock (useful for deterministic tests).
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_refill_strategy(mut self, strategy: RefillStrategy) -> Self {
        self.refill_strategy = strategy;
        self
    }

    /// Select one of the built-in waiters.
    pub fn with_waiting_strategy(mut self, strategy: WaitingStrategy) -> Self {
        self.waiter = strategy.waiter();
        self
    }

    /// Install a custom blocking waiter.
    pub fn with_waiter<W: Waiter + 'static>(mut self, waiter: W) -> Self {
        self.waiter = Arc::new(waiter);
        self
    }

    /// Install the sleeper used by `consume_async`.
    pub fn with_sleeper<S: Sleeper + 'static>(mut self, sleeper: S) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Fail requests larger than any bandwidth can ever hold instead of capping them.
    pub fn reject_oversized_requests(mut self) -> Self {
        self.reject_oversized = true;
        self
    }

    fn fail(mut self, error: ConfigError) -> Self {
        self.error.get_or_insert(error);
        self
    }

    /// Validate and freeze the configuration.
    pub fn build_configuration(self) -> Result<BucketConfiguration, ConfigError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let has_guaranteed = self.guaranteed.is_some();
        let bandwidths: Vec<Bandwidth> = self.guaranteed.into_iter().chain(self.limited).collect();
        if bandwidths.is_empty() {
            return Err(ConfigError::NoBandwidths);
        }
        for bw in &bandwidths {
            bw.validate()?;
        }
        Ok(BucketConfiguration {
            bandwidths,
            has_guaranteed,
            reject_oversized: self.reject_oversized,
            refill_strategy: self.refill_strategy,
            waiter: self.waiter,
            sleeper: self.sleeper,
            clock: self.clock,
        })
    }

    /// Build a bucket that may be shared between threads.
    pub fn build(self) -> Result<SharedBucket, ConfigError> {
        Ok(SharedBucket::new(self.build_configuration()?))
    }

    /// Build a bucket for a single owner; it can move between threads but not be shared.
    pub fn build_local(self) -> Result<LocalBucket, ConfigError> {
        Ok(LocalBucket::new(self.build_configuration()?))
    }
}
