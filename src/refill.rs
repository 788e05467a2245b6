//! Refill strategies: converting elapsed time into tokens.
//!
//! Both strategies are pure functions of `(bandwidth, slot, now)`. Re-running them for the
//! same inputs yields the same slot, which is what lets the lock-free bucket recompute
//! freely after losing a compare-and-swap race.
//!
//! When `now` is behind the slot timestamp (the clock regressed, or another thread
//! published a later reading first) elapsed time is treated as zero and the timestamp is
//! left where it was, so the same interval is never credited twice.

use crate::bandwidth::Bandwidth;
use crate::state::Slot;

/// How elapsed time is credited to a bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RefillStrategy {
    /// Continuous refill proportional to elapsed time.
    #[default]
    Monotone,
    /// Credits `capacity` tokens per whole elapsed period; partial periods carry over.
    Intervally,
}

impl RefillStrategy {
    /// Refill `slot` up to `now`, capped at the bandwidth's capacity.
    pub fn refill(&self, bandwidth: &Bandwidth, slot: Slot, now: i64) -> Slot {
        let elapsed = now.saturating_sub(slot.last_refill_nanos());
        if elapsed <= 0 {
            return slot;
        }
        let capacity = bandwidth.capacity_units();
        match self {
            RefillStrategy::Monotone => {
                let units = slot.units().saturating_add(bandwidth.units_for(elapsed));
                slot.with_units(units.min(capacity), now)
            }
            RefillStrategy::Intervally => {
                let period = bandwidth.period_nanos();
                let periods = elapsed / period;
                if periods == 0 {
                    return slot;
                }
                let added = (periods as u128).saturating_mul(capacity);
                // periods * period <= elapsed, so this cannot pass `now`
                slot.with_units(
                    slot.units().saturating_add(added).min(capacity),
                    slot.last_refill_nanos() + periods * period,
                )
            }
        }
    }

    /// Nanoseconds from `now` until a slot refilled at `now` holds `needed` tokens.
    ///
    /// Returns `0` if it already does.
    pub fn nanos_until(&self, bandwidth: &Bandwidth, slot: Slot, needed: u64, now: i64) -> i64 {
        let deficit = slot.units_for(needed).saturating_sub(slot.units());
        if deficit == 0 {
            return 0;
        }
        match self {
            RefillStrategy::Monotone => bandwidth.nanos_for(deficit),
            RefillStrategy::Intervally => {
                let per_period = bandwidth.capacity_units();
                let periods = deficit / per_period + u128::from(deficit % per_period != 0);
                let periods = i64::try_from(periods).unwrap_or(i64::MAX);
                let boundary = slot
                    .last_refill_nanos()
                    .saturating_add(periods.saturating_mul(bandwidth.period_nanos()));
                boundary.saturating_sub(now).max(1)
            }
        }
    }
}
