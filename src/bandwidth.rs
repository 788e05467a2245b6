//! Bandwidth descriptors: one throughput constraint each.

use crate::error::BandwidthError;
use std::time::Duration;

/// A single throughput constraint: `capacity` tokens refill over `period`.
///
/// Whether a bandwidth acts as the guaranteed floor or as a limited ceiling is decided by
/// how it is handed to the [`BucketBuilder`](crate::BucketBuilder), not by the descriptor.
///
/// ```
/// use bandwidth_limiter::Bandwidth;
/// use std::time::Duration;
///
/// let bw = Bandwidth::new(10, Duration::from_secs(1)).unwrap();
/// assert_eq!(bw.initial_capacity(), 10);
/// assert_eq!(bw.rate_per_second(), 10.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bandwidth {
    capacity: u64,
    initial_capacity: u64,
    period: Duration,
}

impl Bandwidth {
    /// Create a bandwidth that starts full.
    pub fn new(capacity: u64, period: Duration) -> Result<Self, BandwidthError> {
        Self::with_initial_capacity(capacity, period, capacity)
    }

    /// Create a bandwidth that starts with `initial_capacity` tokens.
    pub fn with_initial_capacity(
        capacity: u64,
        period: Duration,
        initial_capacity: u64,
    ) -> Result<Self, BandwidthError> {
        let bandwidth = Self { capacity, initial_capacity, period };
        bandwidth.validate()?;
        Ok(bandwidth)
    }

    /// Re-check the invariants. Descriptors that arrive through deserialization skip the
    /// constructors, so the builder calls this before accepting them.
    pub fn validate(&self) -> Result<(), BandwidthError> {
        if self.capacity == 0 {
            return Err(BandwidthError::ZeroCapacity);
        }
        if self.period.is_zero() {
            return Err(BandwidthError::ZeroPeriod);
        }
        if i64::try_from(self.period.as_nanos()).is_err() {
            return Err(BandwidthError::PeriodTooLong);
        }
        if self.initial_capacity > self.capacity {
            return Err(BandwidthError::InitialCapacityExceedsCapacity {
                initial: self.initial_capacity,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Maximum tokens this bandwidth can hold.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Tokens present when the bucket is created.
    pub fn initial_capacity(&self) -> u64 {
        self.initial_capacity
    }

    /// Time needed to refill `capacity` tokens from empty.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Period in nanoseconds; validated to fit, saturates otherwise.
    pub fn period_nanos(&self) -> i64 {
        i64::try_from(self.period.as_nanos()).unwrap_or(i64::MAX)
    }

    /// Refill rate in tokens per nanosecond.
    pub fn rate_per_nano(&self) -> f64 {
        self.capacity as f64 / self.period_nanos() as f64
    }

    /// Refill rate in tokens per second.
    pub fn rate_per_second(&self) -> f64 {
        self.capacity as f64 / self.period.as_secs_f64()
    }

    /// Fixed-point units per whole token: one unit per nanosecond of the period.
    pub(crate) fn units_per_token(&self) -> u128 {
        self.period_nanos() as u128
    }

    /// Balance of a full slot in units.
    pub(crate) fn capacity_units(&self) -> u128 {
        u128::from(self.capacity) * self.units_per_token()
    }

    /// Units accrued over `elapsed_nanos`, uncapped. Exact: `capacity` units per nanosecond.
    pub(crate) fn units_for(&self, elapsed_nanos: i64) -> u128 {
        u128::from(self.capacity) * u128::try_from(elapsed_nanos).unwrap_or(0)
    }

    /// Nanoseconds needed to accrue `units`, rounded up.
    pub(crate) fn nanos_for(&self, units: u128) -> i64 {
        let capacity = u128::from(self.capacity);
        let nanos = units / capacity + u128::from(units % capacity != 0);
        i64::try_from(nanos).unwrap_or(i64::MAX)
    }
}
