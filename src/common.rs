use std::time::Duration;

/// Outcome of a single admission check.
///
/// Produced fresh by every [`Limiter::allow`](crate::Limiter::allow) call. The
/// informational fields are filled in for both outcomes so callers can surface them
/// (for example as `X-RateLimit-*` / `Retry-After` response headers) whether or not the
/// request was admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllowResult {
    /// Whether the request was admitted (one token consumed).
    pub allowed: bool,
    /// Burst capacity of the bucket that made the decision.
    pub capacity: u64,
    /// Whole tokens left in the bucket after this decision.
    pub remaining: u64,
    /// Best-effort hint for when a rejected caller may succeed.
    ///
    /// Always [`Duration::ZERO`] when `allowed` is `true`. On rejection this is the time
    /// needed to accrue one whole token at the refill rate, ignoring any fractional
    /// progress already made.
    pub retry_after: Duration,
}

impl AllowResult {
    pub(crate) fn allowed(capacity: u64, remaining: u64) -> Self {
        Self {
            allowed: true,
            capacity,
            remaining,
            retry_after: Duration::ZERO,
        }
    }

    pub(crate) fn rejected(capacity: u64, remaining: u64, retry_after: Duration) -> Self {
        Self {
            allowed: false,
            capacity,
            remaining,
            retry_after,
        }
    }
}
