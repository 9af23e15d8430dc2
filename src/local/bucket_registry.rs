use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::TokenBucket;

/// Shared handle to one key's bucket.
pub(crate) type BucketHandle = Arc<Mutex<TokenBucket>>;

/// Concurrent key -> bucket store.
///
/// The only operation that mutates the map is [`get_or_insert_with`](Self::get_or_insert_with),
/// which guarantees exactly one bucket per key for the lifetime of the registry. Shard
/// locks guard the map structure only; callers lock the returned bucket after the shard
/// guard has been released, so inserting a new key never waits on token arithmetic for an
/// existing one.
///
/// Entries are never removed.
pub(crate) struct BucketRegistry {
    buckets: DashMap<String, BucketHandle>,
}

impl BucketRegistry {
    pub(crate) fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Return the bucket for `key`, creating it with `make` if absent.
    ///
    /// The fast path takes a shard read guard. On a miss the shard write guard is taken
    /// through `entry`, which re-checks for a bucket inserted concurrently before calling
    /// `make`, so `make` runs at most once per key.
    pub(crate) fn get_or_insert_with<F>(&self, key: &str, make: F) -> BucketHandle
    where
        F: FnOnce() -> TokenBucket,
    {
        if let Some(bucket) = self.buckets.get(key) {
            return Arc::clone(bucket.value());
        }

        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(make())));

        Arc::clone(bucket.value())
    }

    pub(crate) fn get(&self, key: &str) -> Option<BucketHandle> {
        self.buckets.get(key).map(|bucket| Arc::clone(bucket.value()))
    }

    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
