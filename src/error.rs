/// Error type for this crate.
///
/// Only returned by the validating entry points
/// ([`TokenBucketLimiterOptions::validate`](crate::TokenBucketLimiterOptions::validate) and
/// [`TokenBucketLimiter::try_new`](crate::TokenBucketLimiter::try_new)). Admission checks
/// themselves never fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TollgateError {
    /// Refill rate is not finite or not greater than zero.
    #[error("invalid refill rate {rate}: must be finite and greater than 0")]
    InvalidRefillRate {
        /// The rejected rate, in tokens per second.
        rate: f64,
    },

    /// Capacity is zero, so no request could ever be admitted.
    #[error("invalid capacity: must be greater than 0")]
    InvalidCapacity,

    /// Initial tokens exceed the bucket capacity.
    #[error("initial tokens {initial_tokens} exceed capacity {capacity}")]
    InitialTokensExceedCapacity {
        /// Requested starting token count.
        initial_tokens: u64,
        /// Configured capacity.
        capacity: u64,
    },
}
