//! Behavioural scenarios, run against both the shared and the single-owner bucket.
mod common;

use bandwidth_limiter::{
    Bucket, BucketBuilder, BucketError, Clock, ManualClock, RefillStrategy, StateStorage,
};
use common::test_helpers::{ms, AdvancingWaiter};
use std::time::Duration;

const SEC: Duration = Duration::from_secs(1);

fn build<S: StateStorage>(builder: BucketBuilder, clock: &ManualClock) -> Bucket<S> {
    Bucket::new(builder.with_clock(clock.clone()).build_configuration().unwrap())
}

fn assert_within_capacity<S: StateStorage>(bucket: &Bucket<S>) {
    let snapshot = bucket.snapshot();
    for (slot, bw) in snapshot.slots().iter().zip(bucket.configuration().bandwidths()) {
        assert!(slot.tokens() >= 0.0, "negative balance: {:?}", slot);
        assert!(slot.whole_tokens() <= bw.capacity(), "above capacity: {:?}", slot);
        assert!(slot.tokens() <= bw.capacity() as f64, "above capacity: {:?}", slot);
    }
}

fn single_limited_bandwidth_refills<S: StateStorage>() {
    let clock = ManualClock::new();
    let bucket: Bucket<S> = build(BucketBuilder::new().with_limited_bandwidth(10, SEC), &clock);

    assert!(bucket.try_consume(10).unwrap());
    assert_eq!(bucket.available_tokens(0), Some(0.0));
    assert!(!bucket.try_consume(1).unwrap());

    clock.advance(ms(100));
    assert!(bucket.try_consume(1).unwrap());
    assert!(!bucket.try_consume(1).unwrap());
}

fn guarantee_admits_past_exhausted_ceiling<S: StateStorage>() {
    let clock = ManualClock::new();
    let bucket: Bucket<S> = build(
        BucketBuilder::new().with_guaranteed_bandwidth(5, SEC).with_limited_bandwidth(2, SEC),
        &clock,
    );

    assert!(bucket.try_consume(3).unwrap());
    assert_eq!(bucket.available_tokens(0), Some(2.0));
    // the limited slot could not afford 3 and keeps its balance
    assert_eq!(bucket.available_tokens(1), Some(2.0));
}

fn guarantee_floor_holds_for_every_size<S: StateStorage>() {
    for n in 1..=5 {
        let clock = ManualClock::new();
        let bucket: Bucket<S> = build(
            BucketBuilder::new()
                .with_guaranteed_bandwidth(5, SEC)
                .with_limited_bandwidth_and_initial(100, SEC, 0)
                .with_limited_bandwidth_and_initial(3, SEC, 0),
            &clock,
        );
        assert!(bucket.try_consume(n).unwrap(), "guaranteed floor refused {} tokens", n);
    }
}

fn ceilings_must_all_hold<S: StateStorage>() {
    let clock = ManualClock::new();
    let bucket: Bucket<S> = build(
        BucketBuilder::new()
            .with_limited_bandwidth(10, SEC)
            .with_limited_bandwidth_and_initial(10, SEC, 3),
        &clock,
    );

    assert!(!bucket.try_consume(4).unwrap());
    assert!(bucket.try_consume(3).unwrap());
    assert_eq!(bucket.available_tokens(0), Some(7.0));
    assert_eq!(bucket.available_tokens(1), Some(0.0));
}

fn oversized_request_is_rejected<S: StateStorage>() {
    let clock = ManualClock::new();
    let bucket: Bucket<S> = build(
        BucketBuilder::new().with_limited_bandwidth(5, SEC).reject_oversized_requests(),
        &clock,
    );

    let err = bucket.try_consume(6).unwrap_err();
    assert_eq!(err, BucketError::Unsatisfiable { requested: 6, max_satisfiable: 5 });
    // nothing was taken
    assert_eq!(bucket.available_tokens(0), Some(5.0));
}

fn oversized_request_is_capped<S: StateStorage>() {
    let clock = ManualClock::new();
    let bucket: Bucket<S> = build(BucketBuilder::new().with_limited_bandwidth(5, SEC), &clock);

    assert!(bucket.try_consume(6).unwrap());
    assert_eq!(bucket.available_tokens(0), Some(0.0));
    assert!(!bucket.try_consume(6).unwrap());
}

fn consume_gives_up_at_deadline<S: StateStorage>() {
    let clock = ManualClock::new();
    let waiter = AdvancingWaiter::new(clock.clone());
    let bucket: Bucket<S> = build(
        BucketBuilder::new()
            .with_limited_bandwidth_and_initial(10, SEC, 0)
            .with_waiter(waiter.clone()),
        &clock,
    );

    assert!(!bucket.consume(5, Some(ms(200))).unwrap());
    assert_eq!(clock.now_nanos(), 200_000_000);
    assert!(waiter.calls().iter().all(|d| *d <= ms(200)));
}

fn consume_succeeds_once_refilled<S: StateStorage>() {
    let clock = ManualClock::new();
    let waiter = AdvancingWaiter::new(clock.clone());
    let bucket: Bucket<S> = build(
        BucketBuilder::new()
            .with_limited_bandwidth_and_initial(10, SEC, 0)
            .with_waiter(waiter.clone()),
        &clock,
    );

    assert!(bucket.consume(5, Some(ms(600))).unwrap());
    assert_eq!(clock.now_nanos(), 500_000_000);
    assert_eq!(bucket.available_tokens(0), Some(0.0));
}

fn denial_is_idempotent<S: StateStorage>() {
    let clock = ManualClock::new();
    let bucket: Bucket<S> = build(
        BucketBuilder::new().with_limited_bandwidth_and_initial(10, SEC, 2),
        &clock,
    );
    clock.advance(ms(300));

    assert!(!bucket.try_consume(6).unwrap());
    let first = bucket.snapshot();
    assert!(!bucket.try_consume(6).unwrap());
    let second = bucket.snapshot();
    assert_eq!(first, second);
    assert_eq!(first.available(0), Some(5.0));
}

fn refill_is_monotone_in_time<S: StateStorage>() {
    let mut granted_at = None;
    for step in 0..=10u64 {
        let clock = ManualClock::new();
        let bucket: Bucket<S> = build(
            BucketBuilder::new().with_limited_bandwidth_and_initial(10, SEC, 0),
            &clock,
        );
        clock.advance(ms(step * 100));
        let granted = bucket.try_consume(5).unwrap();
        match granted_at {
            Some(_) => assert!(granted, "later call at {}ms was stricter", step * 100),
            None if granted => granted_at = Some(step),
            None => {}
        }
    }
    assert_eq!(granted_at, Some(5));
}

fn polled_bucket_grants_on_schedule<S: StateStorage>() {
    let clock = ManualClock::new();
    let bucket: Bucket<S> = build(BucketBuilder::new().with_limited_bandwidth(10, SEC), &clock);

    assert!(bucket.try_consume(10).unwrap());
    for _ in 0..9 {
        clock.advance(ms(10));
        assert!(!bucket.try_consume(1).unwrap());
    }
    clock.advance(ms(10));
    assert!(bucket.try_consume(1).unwrap());
}

fn observed_refill_reaches_whole_tokens<S: StateStorage>() {
    let clock = ManualClock::new();
    let bucket: Bucket<S> = build(BucketBuilder::new().with_limited_bandwidth(10, SEC), &clock);
    assert!(bucket.try_consume(10).unwrap());

    // 7ms does not divide the period, so no poll lands on a token boundary until the last
    let mut elapsed = 0;
    while elapsed + 7 < 1_000 {
        clock.advance(ms(7));
        elapsed += 7;
        let seen = bucket.available_tokens(0).unwrap();
        assert!(seen < 10.0, "full after {}ms", elapsed);
    }
    clock.advance(ms(1_000 - elapsed));
    assert_eq!(bucket.available_tokens(0), Some(10.0));
    assert!(bucket.try_consume(10).unwrap());
    assert_eq!(bucket.available_tokens(0), Some(0.0));
}

fn zero_token_request_is_free<S: StateStorage>() {
    let clock = ManualClock::new();
    let bucket: Bucket<S> = build(
        BucketBuilder::new().with_limited_bandwidth_and_initial(10, SEC, 0),
        &clock,
    );
    assert!(bucket.try_consume(0).unwrap());
    assert_eq!(bucket.available_tokens(0), Some(0.0));
}

fn interval_refill_credits_whole_periods<S: StateStorage>() {
    let clock = ManualClock::new();
    let bucket: Bucket<S> = build(
        BucketBuilder::new()
            .with_limited_bandwidth_and_initial(4, ms(100), 0)
            .with_refill_strategy(RefillStrategy::Intervally),
        &clock,
    );

    clock.advance(ms(99));
    assert!(!bucket.try_consume(1).unwrap());
    clock.advance(ms(1));
    assert!(bucket.try_consume(4).unwrap());
    clock.advance(ms(150));
    assert!(bucket.try_consume(4).unwrap());
    // 50ms of the last period still count toward the next one
    clock.advance(ms(50));
    assert!(bucket.try_consume(4).unwrap());
}

fn balances_stay_within_bounds<S: StateStorage>() {
    let clock = ManualClock::new();
    let bucket: Bucket<S> = build(
        BucketBuilder::new()
            .with_guaranteed_bandwidth_and_initial(3, ms(300), 1)
            .with_limited_bandwidth(8, SEC)
            .with_limited_bandwidth_and_initial(20, Duration::from_secs(5), 4),
        &clock,
    );

    let requests = [1u64, 7, 3, 0, 2, 9, 5, 1, 4, 4, 2, 8, 1, 6, 3];
    for (i, n) in requests.iter().enumerate() {
        clock.advance(ms(17 * (i as u64 % 4)));
        let _ = bucket.try_consume(*n).unwrap();
        assert_within_capacity(&bucket);
    }
    clock.advance(Duration::from_secs(60));
    let refilled = bucket.snapshot();
    assert_eq!(refilled.available(0), Some(3.0));
    assert_eq!(refilled.available(1), Some(8.0));
    assert_eq!(refilled.available(2), Some(20.0));
}

macro_rules! for_both_storages {
    ($($scenario:ident),* $(,)?) => {
        mod shared {
            $( #[test] fn $scenario() { super::$scenario::<bandwidth_limiter::AtomicStorage>() } )*
        }
        mod local {
            $( #[test] fn $scenario() { super::$scenario::<bandwidth_limiter::LocalStorage>() } )*
        }
    };
}

for_both_storages!(
    single_limited_bandwidth_refills,
    guarantee_admits_past_exhausted_ceiling,
    guarantee_floor_holds_for_every_size,
    ceilings_must_all_hold,
    oversized_request_is_rejected,
    oversized_request_is_capped,
    consume_gives_up_at_deadline,
    consume_succeeds_once_refilled,
    denial_is_idempotent,
    refill_is_monotone_in_time,
    polled_bucket_grants_on_schedule,
    observed_refill_reaches_whole_tokens,
    zero_token_request_is_free,
    interval_refill_credits_whole_periods,
    balances_stay_within_bounds,
);

#[test]
fn shared_and_local_buckets_agree_step_by_step() {
    let shared_clock = ManualClock::new();
    let local_clock = ManualClock::new();
    let builder = || {
        BucketBuilder::new()
            .with_guaranteed_bandwidth_and_initial(4, ms(400), 2)
            .with_limited_bandwidth(6, SEC)
    };
    let shared = builder().with_clock(shared_clock.clone()).build().unwrap();
    let local = builder().with_clock(local_clock.clone()).build_local().unwrap();

    for (i, n) in [2u64, 5, 1, 4, 3, 6, 2, 2, 7].iter().enumerate() {
        let step = ms(37 * i as u64);
        shared_clock.advance(step);
        local_clock.advance(step);
        assert_eq!(shared.try_consume(*n), local.try_consume(*n), "diverged at step {}", i);
        assert_eq!(shared.snapshot(), local.snapshot(), "diverged at step {}", i);
    }
}

#[test]
fn logging_does_not_disturb_decisions() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
    let clock = ManualClock::new();
    let bucket = BucketBuilder::new()
        .with_limited_bandwidth(2, SEC)
        .with_clock(clock)
        .build()
        .unwrap();
    assert!(bucket.try_consume(5).unwrap());
    assert!(!bucket.try_consume(1).unwrap());
}
