//! Immutable point-in-time snapshots of a bucket.
//!
//! Balances are fixed point: a slot counts `units`, where one token of its bandwidth is
//! `period_nanos` units. Refilling for `elapsed` nanoseconds then adds exactly
//! `capacity * elapsed` units, so the balance depends only on total elapsed time and never
//! on how many times the bucket was refreshed along the way.

use crate::bandwidth::Bandwidth;
use crate::config::BucketConfiguration;

/// Token balance and last refill time for one bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    units: u128,
    units_per_token: u128,
    last_refill_nanos: i64,
}

impl Slot {
    /// Slot holding `tokens` whole tokens of `bandwidth`, last refilled at `at`.
    pub(crate) fn holding(bandwidth: &Bandwidth, tokens: u64, at: i64) -> Self {
        let units_per_token = bandwidth.units_per_token();
        Self { units: u128::from(tokens) * units_per_token, units_per_token, last_refill_nanos: at }
    }

    /// Tokens currently available, in `0.0..=capacity`. Fractional while refilling.
    pub fn tokens(&self) -> f64 {
        self.units as f64 / self.units_per_token as f64
    }

    /// Whole tokens currently available.
    pub fn whole_tokens(&self) -> u64 {
        u64::try_from(self.units / self.units_per_token).unwrap_or(u64::MAX)
    }

    /// Clock reading of the last refill.
    pub fn last_refill_nanos(&self) -> i64 {
        self.last_refill_nanos
    }

    pub(crate) fn units(&self) -> u128 {
        self.units
    }

    /// Units that `tokens` whole tokens amount to in this slot.
    pub(crate) fn units_for(&self, tokens: u64) -> u128 {
        u128::from(tokens) * self.units_per_token
    }

    pub(crate) fn can_afford(&self, tokens: u64) -> bool {
        self.units >= self.units_for(tokens)
    }

    pub(crate) fn with_units(self, units: u128, at: i64) -> Self {
        Self { units, last_refill_nanos: at, ..self }
    }
}

/// One [`Slot`] per configured bandwidth, in configuration order (guaranteed first, then
/// limited).
///
/// Snapshots are values: every accepted update produces a whole new snapshot, so all slots
/// always describe the same logical instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketState {
    slots: Box<[Slot]>,
}

impl BucketState {
    /// Initial snapshot: every bandwidth at its initial capacity as of `now`.
    pub fn initial(config: &BucketConfiguration, now: i64) -> Self {
        let slots = config
            .bandwidths()
            .iter()
            .map(|bw| Slot::holding(bw, bw.initial_capacity(), now))
            .collect();
        Self { slots }
    }

    /// Snapshot refilled up to `now` with the configured strategy.
    pub fn refilled(&self, config: &BucketConfiguration, now: i64) -> Self {
        let strategy = config.refill_strategy();
        let slots = self
            .slots
            .iter()
            .zip(config.bandwidths())
            .map(|(slot, bw)| strategy.refill(bw, *slot, now))
            .collect();
        Self { slots }
    }

    /// All slots in configuration order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Slot at `index`, if configured.
    pub fn slot(&self, index: usize) -> Option<Slot> {
        self.slots.get(index).copied()
    }

    /// Available tokens at `index`, if configured.
    pub fn available(&self, index: usize) -> Option<f64> {
        self.slot(index).map(|s| s.tokens())
    }

    /// Copy with `tokens` taken from every slot that can afford them. Slots that cannot
    /// keep their balance.
    pub(crate) fn debited(&self, tokens: u64) -> Self {
        let slots = self
            .slots
            .iter()
            .map(|slot| {
                if slot.can_afford(tokens) {
                    slot.with_units(slot.units - slot.units_for(tokens), slot.last_refill_nanos)
                } else {
                    *slot
                }
            })
            .collect();
        Self { slots }
    }

    #[cfg(test)]
    pub(crate) fn from_slots(slots: Vec<Slot>) -> Self {
        Self { slots: slots.into_boxed_slice() }
    }
}
