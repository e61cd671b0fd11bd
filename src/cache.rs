use std::time::Duration;

use moka::ops::compute::Op;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;

/// Error type for replay cache operations.
#[derive(Debug, thiserror::Error)]
pub enum ReplayCacheError {
    #[error("replay cache operation failed: {0}")]
    Other(String),
}

/// Replay cache abstraction for rejecting reused `timestamp:nonce` keys.
///
/// Implementations backed by a shared network store give replay protection
/// across edge instances; the in-memory one covers a single process.
pub trait ReplayCache: Send + Sync {
    /// Whether `key` was marked and its expiry (unix seconds) is still after `now`.
    fn seen(&self, key: &str, now: u64) -> Result<bool, ReplayCacheError>;

    /// Record `key` until `expires_at`, replacing any previous entry.
    fn mark(&self, key: &str, expires_at: u64) -> Result<(), ReplayCacheError>;

    /// Atomically record `key` unless a live entry exists.
    /// Returns `Ok(true)` if inserted, `Ok(false)` if it already existed and is still valid.
    fn insert_if_absent(
        &self,
        key: &str,
        expires_at: u64,
        now: u64,
    ) -> Result<bool, ReplayCacheError>;
}

/// In-memory replay cache backed by `moka::sync::Cache` storing expiry timestamps.
///
/// Capacity overflow evicts the least recently used key; the moka TTL drops
/// entries that were never looked at again. Either way an evicted key becomes
/// acceptable again.
#[derive(Debug, Clone)]
pub struct MokaReplayCache {
    inner: Cache<String, u64>,
}

impl MokaReplayCache {
    pub fn new(max_capacity: u64, lifetime: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(lifetime)
                .eviction_policy(EvictionPolicy::lru())
                .build(),
        }
    }

    /// Entries currently held, after flushing pending evictions.
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl ReplayCache for MokaReplayCache {
    fn seen(&self, key: &str, now: u64) -> Result<bool, ReplayCacheError> {
        Ok(self.inner.get(key).is_some_and(|exp| exp > now))
    }

    fn mark(&self, key: &str, expires_at: u64) -> Result<(), ReplayCacheError> {
        self.inner.insert(key.to_owned(), expires_at);
        Ok(())
    }

    fn insert_if_absent(
        &self,
        key: &str,
        expires_at: u64,
        now: u64,
    ) -> Result<bool, ReplayCacheError> {
        let mut inserted = false;
        self.inner
            .entry_by_ref(key)
            .and_compute_with(|existing| match existing {
                Some(entry) if *entry.value() > now => Op::Nop,
                _ => {
                    inserted = true;
                    Op::Put(expires_at)
                }
            });
        Ok(inserted)
    }
}
