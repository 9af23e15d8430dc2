use crate::{
    AllowResult, Clock, Limiter, SystemClock, TokenBucket, TollgateError,
    local::bucket_registry::{BucketHandle, BucketRegistry},
};

/// Configuration shared by every bucket a [`TokenBucketLimiter`] creates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TokenBucketLimiterOptions {
    /// Tokens granted per second of elapsed time.
    pub refill_rate: f64,
    /// Maximum tokens a bucket can hold (burst size).
    pub capacity: u64,
    /// Tokens a bucket starts with when a key is first seen.
    pub initial_tokens: u64,
}

impl TokenBucketLimiterOptions {
    /// Options whose buckets start full.
    pub fn full(refill_rate: f64, capacity: u64) -> Self {
        Self {
            refill_rate,
            capacity,
            initial_tokens: capacity,
        }
    }

    /// Check that buckets built from these options can both refill and admit.
    pub fn validate(&self) -> Result<(), TollgateError> {
        if !self.refill_rate.is_finite() || self.refill_rate <= 0.0 {
            return Err(TollgateError::InvalidRefillRate {
                rate: self.refill_rate,
            });
        }

        if self.capacity == 0 {
            return Err(TollgateError::InvalidCapacity);
        }

        if self.initial_tokens > self.capacity {
            return Err(TollgateError::InitialTokensExceedCapacity {
                initial_tokens: self.initial_tokens,
                capacity: self.capacity,
            });
        }

        Ok(())
    }
}

/// Per-key token bucket rate limiter for in-process use.
///
/// Every distinct key gets its own [`TokenBucket`], created lazily on first use with the
/// limiter's options. Admission checks for one key are serialized through that bucket's
/// mutex, so concurrent callers can never collectively take more tokens than the bucket
/// held.
///
/// # Thread Safety
///
/// - Uses [`DashMap`](dashmap::DashMap) for the key -> bucket registry
/// - Uses one [`parking_lot::Mutex`] per bucket for the refill-and-take sequence
/// - Safe for multi-threaded use without external synchronization; share it via `Arc`
///
/// # Semantics & Limitations
///
/// **No validation on construction:**
/// - [`new`](Self::new) and [`with_options`](Self::with_options) accept any options
/// - A non-positive rate never refills; a zero capacity never admits
/// - Use [`try_new`](Self::try_new) to reject such options up front
///
/// **Memory growth:**
/// - Buckets are never removed
/// - Unbounded key cardinality will grow memory
///
/// # Examples
///
/// ```
/// use tollgate::{SystemClock, TokenBucketLimiter};
///
/// // 2 tokens/s, bursts of up to 3, buckets start full.
/// let limiter = TokenBucketLimiter::new(2.0, 3, 3, SystemClock);
///
/// let result = limiter.allow("203.0.113.7");
/// assert!(result.allowed);
/// assert_eq!(result.capacity, 3);
/// ```
pub struct TokenBucketLimiter<C: Clock = SystemClock> {
    options: TokenBucketLimiterOptions,
    clock: C,
    buckets: BucketRegistry,
}

impl<C: Clock> TokenBucketLimiter<C> {
    /// Create a limiter whose buckets refill at `refill_rate` tokens per second, hold at
    /// most `capacity` tokens and start with `initial_tokens`.
    pub fn new(refill_rate: f64, capacity: u64, initial_tokens: u64, clock: C) -> Self {
        Self::with_options(
            TokenBucketLimiterOptions {
                refill_rate,
                capacity,
                initial_tokens,
            },
            clock,
        )
    }

    /// Create a limiter from `options` without validating them.
    pub fn with_options(options: TokenBucketLimiterOptions, clock: C) -> Self {
        if !options.refill_rate.is_finite() || options.refill_rate <= 0.0 {
            tracing::warn!(
                refill_rate = options.refill_rate,
                "token_bucket_limiter.new, refill rate is not positive; buckets will never refill"
            );
        }

        if options.capacity == 0 {
            tracing::warn!("token_bucket_limiter.new, capacity is 0; no request will be admitted");
        }

        Self {
            options,
            clock,
            buckets: BucketRegistry::new(),
        }
    } // end constructor

    /// Create a limiter, rejecting options that could never refill or never admit.
    pub fn try_new(options: TokenBucketLimiterOptions, clock: C) -> Result<Self, TollgateError> {
        options.validate()?;
        Ok(Self::with_options(options, clock))
    }

    /// Check admission for `key`, consuming one token if available.
    ///
    /// # Behavior
    ///
    /// 1. Look up the bucket for `key`, creating it on first use
    /// 2. Lock the bucket and read the clock
    /// 3. Refill from elapsed time, capped at capacity
    /// 4. Take one token if available
    pub fn allow(&self, key: &str) -> AllowResult {
        let bucket = self.get_or_create_bucket(key);
        let mut bucket = bucket.lock();

        let result = bucket.try_acquire(self.clock.now());

        if !result.allowed {
            tracing::trace!(
                key,
                retry_after = ?result.retry_after,
                "token_bucket_limiter.allow, rejected"
            );
        }

        result
    } // end method allow

    /// Tokens held by `key`'s bucket as of its last admission check.
    ///
    /// Does not refill or create the bucket. Returns `None` for unseen keys.
    pub fn remaining(&self, key: &str) -> Option<u64> {
        self.buckets.get(key).map(|bucket| bucket.lock().tokens())
    }

    /// Whether a bucket exists for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.buckets.get(key).is_some()
    }

    /// Number of keys with a bucket.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no key has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Options every bucket is created with.
    pub fn options(&self) -> &TokenBucketLimiterOptions {
        &self.options
    }

    pub(crate) fn get_or_create_bucket(&self, key: &str) -> BucketHandle {
        self.buckets.get_or_insert_with(key, || {
            tracing::trace!(key, "token_bucket_limiter.bucket.created");

            TokenBucket::new(
                self.options.refill_rate,
                self.options.capacity,
                self.options.initial_tokens,
                self.clock.now(),
            )
        })
    }
} // end of impl

impl<C: Clock> Limiter for TokenBucketLimiter<C> {
    fn allow(&self, key: &str) -> AllowResult {
        TokenBucketLimiter::allow(self, key)
    }
}
