#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Bandwidth Limiter
//!
//! A token bucket that enforces several bandwidths at once, refills continuously, and is
//! safe to hammer from many threads without a lock.
//!
//! ## Features
//!
//! - **Multiple limited bandwidths** acting together as hard ceilings
//! - **One optional guaranteed bandwidth** acting as a throughput floor that the ceilings
//!   never block
//! - **Lock-free updates**: snapshots are replaced with compare-and-swap, never mutated
//! - **Single-owner variant** with the same behavior and no synchronization
//! - **Pluggable refill, waiting, and clock** strategies; a manual clock for tests
//! - **Tower middleware** charging the bucket per request
//!
//! ## Quick Start
//!
//! ```rust
//! use bandwidth_limiter::BucketBuilder;
//! use std::time::Duration;
//!
//! let bucket = BucketBuilder::new()
//!     .with_limited_bandwidth(1_000, Duration::from_secs(60))
//!     .with_limited_bandwidth(50, Duration::from_secs(1))
//!     .build()
//!     .unwrap();
//!
//! if bucket.try_consume(1).unwrap() {
//!     // go ahead
//! }
//! // or block for up to 100ms waiting for refill
//! let granted = bucket.consume(10, Some(Duration::from_millis(100))).unwrap();
//! # let _ = granted;
//! ```

mod admission;
pub mod bandwidth;
pub mod bucket;
pub mod clock;
pub mod config;
pub mod error;
pub mod prelude;
pub mod refill;
pub mod state;
pub mod storage;
pub mod throttle;
pub mod waiting;

// Re-exports
pub use bandwidth::Bandwidth;
pub use bucket::{Bucket, LocalBucket, SharedBucket};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{BucketBuilder, BucketConfiguration, BucketSettings};
pub use error::{BandwidthError, BucketError, ConfigError, ThrottleError};
pub use refill::RefillStrategy;
pub use state::{BucketState, Slot};
pub use storage::{AtomicStorage, LocalStorage, StateStorage, Transition};
pub use throttle::{ThrottleLayer, ThrottleService};
pub use waiting::{
    InstantSleeper, ParkingWaiter, Sleeper, SpinningWaiter, TokioSleeper, Waiter,
    WaitingStrategy, YieldingWaiter,
};
