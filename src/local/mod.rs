//! In-process token bucket rate limiting.
//!
//! State lives within the current process, in thread-safe data structures
//! ([`DashMap`](dashmap::DashMap) for the key registry, one
//! [`parking_lot::Mutex`] per bucket).
//!
//! # Key Characteristics
//!
//! - **Thread-safe:** Safe for concurrent use across multiple threads
//! - **Exact per key:** Concurrent callers on one key never over-admit
//! - **Lazy refill:** No background timers; buckets refill when checked
//! - **Process-scoped:** State is not shared across processes or persisted
//!
//! # Examples
//!
//! ```
//! use std::{sync::Arc, time::Duration};
//! use tollgate::{ManualClock, TokenBucketLimiter, TokenBucketLimiterOptions};
//!
//! let clock = Arc::new(ManualClock::new());
//! let limiter = TokenBucketLimiter::try_new(
//!     TokenBucketLimiterOptions::full(1.0, 2),
//!     Arc::clone(&clock),
//! )
//! .unwrap();
//!
//! assert!(limiter.allow("user_123").allowed);
//! assert!(limiter.allow("user_123").allowed);
//!
//! let denied = limiter.allow("user_123");
//! assert!(!denied.allowed);
//! assert_eq!(denied.retry_after, Duration::from_secs(1));
//!
//! // Other keys are unaffected.
//! assert!(limiter.allow("user_456").allowed);
//!
//! clock.advance(Duration::from_secs(1));
//! assert!(limiter.allow("user_123").allowed);
//! ```

mod bucket_registry;

mod token_bucket;
pub use token_bucket::*;

mod token_bucket_limiter;
pub use token_bucket_limiter::*;
