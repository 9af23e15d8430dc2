use std::time::{Duration, Instant};

use crate::TokenBucket;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn initial_tokens_are_clamped_to_capacity() {
    let bucket = TokenBucket::new(1.0, 3, 10, Instant::now());

    assert_eq!(bucket.tokens(), 3);
    assert_eq!(bucket.capacity(), 3);
}

#[test]
fn burst_drains_one_token_per_call() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(1.0, 3, 3, t0);

    let remaining: Vec<u64> = (0..3)
        .map(|_| {
            let result = bucket.try_acquire(t0);
            assert!(result.allowed);
            assert_eq!(result.retry_after, Duration::ZERO);
            result.remaining
        })
        .collect();
    assert_eq!(remaining, vec![2, 1, 0]);

    let result = bucket.try_acquire(t0);
    assert!(!result.allowed);
    assert_eq!(result.remaining, 0);
    assert_eq!(result.capacity, 3);
}

#[test]
fn fractional_progress_is_carried_between_checks() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(2.0, 10, 0, t0);

    // 1.5 tokens accrue: one is taken, half a token is carried.
    let result = bucket.try_acquire(t0 + ms(750));
    assert!(result.allowed);
    assert_eq!(result.remaining, 0);
    assert_eq!(bucket.remainder(), 0.5);

    // Another half token completes the carried one.
    let result = bucket.try_acquire(t0 + ms(1000));
    assert!(result.allowed);
    assert_eq!(result.remaining, 0);
    assert_eq!(bucket.remainder(), 0.0);
}

#[test]
fn zero_yield_checks_do_not_count_elapsed_time_twice() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(1.0, 5, 0, t0);

    assert!(!bucket.try_acquire(t0).allowed);
    assert!(!bucket.try_acquire(t0 + ms(400)).allowed);
    assert_eq!(bucket.last_refill(), t0);

    // Only 0.8s have passed in total, so no whole token exists yet.
    assert!(!bucket.try_acquire(t0 + ms(800)).allowed);
    assert!(bucket.remainder() < 1.0);

    let result = bucket.try_acquire(t0 + ms(1100));
    assert!(result.allowed);
    assert_eq!(result.remaining, 0);
    assert_eq!(bucket.last_refill(), t0 + Duration::from_secs(1));
}

#[test]
fn polling_every_100ms_yields_a_token_at_one_second() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(1.0, 1, 0, t0);

    for i in 1..10 {
        assert!(!bucket.try_acquire(t0 + ms(100) * i).allowed, "poll {i}");
    }

    let result = bucket.try_acquire(t0 + ms(1000));
    assert!(result.allowed);
    assert_eq!(bucket.remainder(), 0.0);
}

#[test]
fn steady_polling_admits_at_the_configured_rate() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(1.0, 1, 0, t0);

    let admitted: Vec<u32> = (1..=100)
        .filter(|&i| bucket.try_acquire(t0 + ms(100) * i).allowed)
        .collect();

    assert_eq!(admitted, (1..=10).map(|s| s * 10).collect::<Vec<u32>>());
}

#[test]
fn unspent_fraction_is_kept_when_whole_tokens_accrue() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(2.0, 10, 0, t0);

    // 2.5 tokens: two are credited, the last quarter second stays behind the anchor.
    let result = bucket.try_acquire(t0 + ms(1250));
    assert!(result.allowed);
    assert_eq!(result.remaining, 1);
    assert_eq!(bucket.last_refill(), t0 + Duration::from_secs(1));
    assert_eq!(bucket.remainder(), 0.5);

    let result = bucket.try_acquire(t0 + ms(1500));
    assert!(result.allowed);
    assert_eq!(result.remaining, 1);
}

#[test]
fn refill_is_capped_at_capacity() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(100.0, 4, 1, t0);

    let result = bucket.try_acquire(t0 + Duration::from_secs(60));
    assert!(result.allowed);
    assert_eq!(result.remaining, 3);
}

#[test]
fn backward_clock_grants_nothing_and_keeps_last_refill() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(1.0, 5, 0, t0);

    let result = bucket.try_acquire(t0 + Duration::from_secs(2));
    assert!(result.allowed);
    assert_eq!(result.remaining, 1);

    // Clock jumps back one second.
    let result = bucket.try_acquire(t0 + Duration::from_secs(1));
    assert!(result.allowed);
    assert_eq!(result.remaining, 0);
    assert_eq!(bucket.last_refill(), t0 + Duration::from_secs(2));

    // Half a second after the latest observed instant is not enough for a token.
    let result = bucket.try_acquire(t0 + ms(2500));
    assert!(!result.allowed);
}

#[test]
fn rejected_retry_after_is_time_per_token() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(4.0, 1, 0, t0);

    let result = bucket.try_acquire(t0);
    assert!(!result.allowed);
    assert_eq!(result.retry_after, ms(250));

    // The hint ignores progress already made toward the next token.
    let result = bucket.try_acquire(t0 + ms(200));
    assert!(!result.allowed);
    assert_eq!(result.retry_after, ms(250));
}

#[test]
fn non_positive_rate_never_refills() {
    for rate in [0.0, -3.0, f64::NAN] {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new(rate, 2, 1, t0);

        assert!(bucket.try_acquire(t0).allowed);

        let result = bucket.try_acquire(t0 + Duration::from_secs(3600));
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
        assert_eq!(result.retry_after, Duration::MAX);
        assert_eq!(bucket.remainder(), 0.0);
    }
}

#[test]
fn infinite_rate_fills_to_capacity() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(f64::INFINITY, 3, 0, t0);

    let result = bucket.try_acquire(t0 + ms(1));
    assert!(result.allowed);
    assert_eq!(result.remaining, 2);
}

#[test]
fn zero_capacity_never_admits() {
    let t0 = Instant::now();
    let mut bucket = TokenBucket::new(10.0, 0, 5, t0);

    for i in 0..10 {
        let result = bucket.try_acquire(t0 + Duration::from_secs(i));
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }
}

#[test]
fn tokens_stay_within_capacity_for_arbitrary_sequences() {
    let t0 = Instant::now();
    let capacity = 7;
    let mut bucket = TokenBucket::new(3.3, capacity, 7, t0);

    // xorshift64
    let mut seed = 0x9E37_79B9_7F4A_7C15_u64;
    let mut next = || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };

    let mut now = t0;
    for _ in 0..10_000 {
        now += ms(next() % 700);
        let result = bucket.try_acquire(now);

        assert!(bucket.tokens() <= capacity);
        assert!(result.remaining <= capacity);
        assert!((0.0..1.0).contains(&bucket.remainder()));
    }
}
