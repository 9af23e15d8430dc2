use std::time::{Duration, Instant};

use crate::AllowResult;

/// State machine for a single key: lazy refill followed by a one-token take.
///
/// A bucket holds whole tokens plus fractional progress toward the next one. Refill is
/// computed from the time elapsed since the last refill whenever an admission check runs,
/// so there are no background timers.
///
/// # Algorithm
///
/// 1. `elapsed = now - last_refill` (zero if the clock moved backwards)
/// 2. `accumulated = refill_rate * elapsed_secs`, `whole = floor(accumulated)`
/// 3. If `whole > 0`: `tokens = min(capacity, tokens + whole)` and `last_refill` moves
///    forward by exactly the time those whole tokens took to accrue
/// 4. Take one token if at least one is available
///
/// `last_refill` stays put on checks that yield no whole token, and when it does move it
/// keeps the unspent fraction of the interval behind it. Partial progress is therefore
/// always measured from a single instant rather than summed across checks, so polling
/// neither loses nor double counts time. `remainder` is `accumulated - whole` as of the
/// last check.
///
/// Not synchronized: the owning limiter wraps each bucket in its own mutex so the
/// refill-and-take sequence is atomic per key.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u64,
    refill_rate: f64,
    tokens: u64,
    remainder: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket observed for the first time at `created_at`.
    ///
    /// `initial_tokens` above `capacity` are clamped to `capacity`.
    pub fn new(refill_rate: f64, capacity: u64, initial_tokens: u64, created_at: Instant) -> Self {
        Self {
            capacity,
            refill_rate,
            tokens: initial_tokens.min(capacity),
            remainder: 0.0,
            last_refill: created_at,
        }
    }

    /// Refill from the time elapsed up to `now`, then try to take one token.
    pub fn try_acquire(&mut self, now: Instant) -> AllowResult {
        self.refill(now);

        if self.tokens >= 1 {
            self.tokens -= 1;
            return AllowResult::allowed(self.capacity, self.tokens);
        }

        AllowResult::rejected(self.capacity, self.tokens, self.time_per_token())
    }

    /// Whole tokens currently held, as of the last refill.
    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    /// Fractional progress toward the next whole token, in `[0, 1)`.
    pub fn remainder(&self) -> f64 {
        self.remainder
    }

    /// Maximum number of tokens the bucket can hold.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Instant elapsed time is currently measured from.
    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let accumulated = self.refill_rate * elapsed.as_secs_f64();

        // NaN and non-positive rates never produce tokens.
        if accumulated.is_nan() || accumulated <= 0.0 {
            self.remainder = 0.0;
            return;
        }

        let whole = accumulated.floor();
        if whole < 1.0 {
            self.remainder = accumulated;
            return;
        }

        self.remainder = if whole.is_finite() {
            accumulated - whole
        } else {
            0.0
        };

        // Move the anchor by the time the whole tokens took, never past `now`. Non-finite
        // spans (infinite rate) anchor at `now`.
        self.last_refill = Duration::try_from_secs_f64(whole / self.refill_rate)
            .ok()
            .and_then(|spent| self.last_refill.checked_add(spent))
            .map_or(now, |anchor| anchor.min(now));

        // Float to int casts saturate, so an infinite rate simply fills the bucket.
        let whole_tokens = whole as u64;
        self.tokens = self.tokens.saturating_add(whole_tokens).min(self.capacity);
    } // end method refill

    fn time_per_token(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.refill_rate).unwrap_or(Duration::MAX)
    }
} // end of impl
