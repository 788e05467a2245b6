//! Admission decision over a refilled snapshot.
//!
//! Rule: a request of `n` tokens is granted when the guaranteed slot holds at least `n`,
//! or when every limited slot does (vacuously true without limited bandwidths). On grant,
//! every slot that can afford `n` is debited independently; the others keep their balance
//! so no slot ever goes negative.

use crate::config::BucketConfiguration;
use crate::error::BucketError;
use crate::state::BucketState;

/// Outcome of evaluating one request against one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Admission {
    /// Debited snapshot to publish.
    Granted(BucketState),
    /// Not enough tokens; `wait_nanos` is the earliest point a retry could succeed,
    /// assuming no one else consumes meanwhile.
    Denied { wait_nanos: i64 },
}

/// Apply the oversized-request policy: either cap `requested` to the largest satisfiable
/// amount or fail.
pub(crate) fn effective_request(
    config: &BucketConfiguration,
    requested: u64,
) -> Result<u64, BucketError> {
    match config.max_satisfiable() {
        Some(max) if requested > max => {
            if config.rejects_oversized_requests() {
                tracing::debug!(requested, max, "bucket: rejecting unsatisfiable request");
                Err(BucketError::Unsatisfiable { requested, max_satisfiable: max })
            } else {
                tracing::debug!(requested, max, "bucket: capping oversized request");
                Ok(max)
            }
        }
        _ => Ok(requested),
    }
}

/// Decide `tokens` against a snapshot already refilled up to `now`.
pub(crate) fn decide(
    state: &BucketState,
    config: &BucketConfiguration,
    tokens: u64,
    now: i64,
) -> Admission {
    let guaranteed_ok =
        config.guaranteed().is_some() && state.slot(0).is_some_and(|s| s.can_afford(tokens));
    let limited = state.slots().get(config.limited_offset()..).unwrap_or(&[]);
    let limited_ok = limited.iter().all(|s| s.can_afford(tokens));

    if guaranteed_ok || limited_ok {
        Admission::Granted(state.debited(tokens))
    } else {
        Admission::Denied { wait_nanos: wait_estimate(state, config, tokens, now) }
    }
}

/// Time until either admission path could open: the guaranteed slot alone, or the slowest
/// of the limited slots.
fn wait_estimate(state: &BucketState, config: &BucketConfiguration, n: u64, now: i64) -> i64 {
    let strategy = config.refill_strategy();

    let guaranteed = config
        .guaranteed()
        .zip(state.slot(0))
        .filter(|(bw, _)| n <= bw.capacity())
        .map(|(bw, slot)| strategy.nanos_until(bw, slot, n, now));

    let offset = config.limited_offset();
    let limited = config
        .limited_ceiling()
        .filter(|ceiling| n <= *ceiling)
        .map(|_| {
            config
                .limited()
                .iter()
                .zip(state.slots().get(offset..).unwrap_or(&[]))
                .map(|(bw, slot)| strategy.nanos_until(bw, *slot, n, now))
                .max()
                .unwrap_or(0)
        });

    match (guaranteed, limited) {
        (Some(g), Some(l)) => g.min(l),
        (Some(w), None) | (None, Some(w)) => w,
        (None, None) => i64::MAX,
    }
}
