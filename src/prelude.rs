//! Convenient re-exports for common bucket types.
pub use crate::{
    bandwidth::Bandwidth,
    bucket::{LocalBucket, SharedBucket},
    clock::{Clock, ManualClock, MonotonicClock},
    config::{BucketBuilder, BucketConfiguration},
    error::{BucketError, ConfigError},
    refill::RefillStrategy,
    throttle::ThrottleLayer,
    waiting::{Waiter, WaitingStrategy},
};
