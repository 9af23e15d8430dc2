//! Collaborator-facing entrypoint.
//!
//! HTTP middleware and similar callers only need one operation: ask whether a request
//! for a given key may proceed. [`Limiter`] captures that contract so callers can be
//! written against the trait and handed a [`TokenBucketLimiter`](crate::TokenBucketLimiter)
//! (or a test double) at startup.

use std::sync::Arc;

use crate::AllowResult;

/// Per-key admission control.
pub trait Limiter: Send + Sync {
    /// Decide whether one unit of work for `key` may proceed.
    ///
    /// Total: every key, including the empty string, yields a result.
    fn allow(&self, key: &str) -> AllowResult;
}

impl<L: Limiter + ?Sized> Limiter for Arc<L> {
    fn allow(&self, key: &str) -> AllowResult {
        (**self).allow(key)
    }
}

impl<L: Limiter + ?Sized> Limiter for &L {
    fn allow(&self, key: &str) -> AllowResult {
        (**self).allow(key)
    }
}
