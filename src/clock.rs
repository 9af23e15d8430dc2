//! Time sources used by the limiter.
//!
//! Refill arithmetic never reads ambient time: every limiter is built with a [`Clock`],
//! which is consulted once per admission check while the bucket lock is held.
//!
//! - [`SystemClock`]: monotonic process clock, for production use.
//! - [`ManualClock`]: settable clock that only moves when told to, for deterministic tests.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

/// A source of the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current instant in time.
    fn now(&self) -> Instant;
}

/// Monotonic clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock whose reading only changes through [`advance`](ManualClock::advance) or
/// [`set`](ManualClock::set).
///
/// Share it with a limiter through an [`Arc`] (or a reference) and move time forward from
/// the test body:
///
/// ```
/// use std::{sync::Arc, time::Duration};
/// use tollgate::{ManualClock, TokenBucketLimiter};
///
/// let clock = Arc::new(ManualClock::new());
/// let limiter = TokenBucketLimiter::new(5.0, 4, 0, Arc::clone(&clock));
///
/// assert!(!limiter.allow("10.0.0.1").allowed);
/// clock.advance(Duration::from_millis(500));
/// assert_eq!(limiter.allow("10.0.0.1").remaining, 1);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Instant>,
}

impl ManualClock {
    /// Create a clock frozen at the current system instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a clock frozen at `start`.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`.
    ///
    /// Leaves the clock unchanged if the result is not representable.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock();
        if let Some(next) = current.checked_add(by) {
            *current = next;
        }
    }

    /// Set the clock to an arbitrary instant, including one in the past.
    pub fn set(&self, to: Instant) {
        *self.current.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
