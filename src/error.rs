//! Error types for bandwidth configuration and token consumption.
//!
//! Denial and deadline expiry are not errors: `try_consume`/`consume` report them as
//! `Ok(false)`. Only conditions that retrying can never fix surface as `Err`.
use std::fmt;

/// Errors produced while validating a single [`Bandwidth`](crate::Bandwidth).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BandwidthError {
    /// Capacity must be > 0.
    #[error("bandwidth capacity must be > 0")]
    ZeroCapacity,
    /// Refill period must be > 0.
    #[error("bandwidth period must be > 0")]
    ZeroPeriod,
    /// Refill period does not fit into `i64` nanoseconds.
    #[error("bandwidth period is too long to be measured in i64 nanoseconds")]
    PeriodTooLong,
    /// Initial tokens may not exceed capacity.
    #[error("initial capacity {initial} exceeds capacity {capacity}")]
    InitialCapacityExceedsCapacity {
        /// Value provided by caller.
        initial: u64,
        /// Configured maximum.
        capacity: u64,
    },
}

/// Errors produced when assembling a bucket configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// At most one guaranteed bandwidth may be configured.
    #[error("only one guaranteed bandwidth is supported")]
    MultipleGuaranteedBandwidths,
    /// A bucket needs at least one bandwidth to enforce.
    #[error("at least one guaranteed or limited bandwidth is required")]
    NoBandwidths,
    /// One of the supplied bandwidths failed validation.
    #[error("invalid bandwidth: {0}")]
    InvalidBandwidth(#[from] BandwidthError),
}

/// Errors returned by consume operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BucketError {
    /// The request can never be satisfied: it exceeds the guaranteed capacity (if any) and
    /// the smallest limited capacity. Only raised when oversized requests are rejected.
    #[error("requested {requested} tokens but at most {max_satisfiable} can ever be available")]
    Unsatisfiable {
        /// Tokens the caller asked for.
        requested: u64,
        /// Largest request the configuration can ever admit.
        max_satisfiable: u64,
    },
}

impl BucketError {
    /// Check if this error is an unsatisfiable request.
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, Self::Unsatisfiable { .. })
    }
}

/// Error type for services wrapped by [`ThrottleLayer`](crate::ThrottleLayer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThrottleError<E> {
    /// The bucket had no room for the request within the allowed wait.
    Throttled {
        /// Tokens the request would have consumed.
        cost: u64,
    },
    /// The bucket refused the request outright.
    Bucket(BucketError),
    /// The underlying service failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for ThrottleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Throttled { cost } => write!(f, "request throttled (cost {} tokens)", cost),
            Self::Bucket(e) => write!(f, "bucket rejected request: {}", e),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ThrottleError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Bucket(e) => Some(e),
            Self::Throttled { .. } => None,
        }
    }
}

impl<E> From<BucketError> for ThrottleError<E> {
    fn from(e: BucketError) -> Self {
        Self::Bucket(e)
    }
}

impl<E> ThrottleError<E> {
    /// Check if the request was throttled.
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
    /// Check if the bucket rejected the request as unsatisfiable.
    pub fn is_bucket(&self) -> bool {
        matches!(self, Self::Bucket(_))
    }
    /// Check if this error wraps an inner error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }
    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}
