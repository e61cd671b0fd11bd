//! Fixed-window admission counting per caller identity.

use std::time::Duration;

use moka::ops::compute::Op;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;

/// Length of one counting window.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit operation failed: {0}")]
    Other(String),
}

pub trait RateLimiter: Send + Sync {
    /// Count one admission for `identity` at `now` (unix seconds).
    ///
    /// Returns `Ok(false)` without counting once the ceiling for the current
    /// window is reached.
    fn try_admit(&self, identity: &str, now: u64) -> Result<bool, RateLimitError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    started_at: u64,
    count: u32,
}

/// In-memory limiter backed by `moka::sync::Cache`.
///
/// A window opens on the first admission for an identity and closes
/// [`RATE_WINDOW`] later; the next admission after that opens a fresh one.
#[derive(Debug, Clone)]
pub struct MokaRateLimiter {
    inner: Cache<String, Window>,
    max_requests: u32,
    window_secs: u64,
}

impl MokaRateLimiter {
    pub fn new(max_requests: u32, max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(RATE_WINDOW)
                .eviction_policy(EvictionPolicy::lru())
                .build(),
            max_requests,
            window_secs: RATE_WINDOW.as_secs(),
        }
    }
}

impl RateLimiter for MokaRateLimiter {
    fn try_admit(&self, identity: &str, now: u64) -> Result<bool, RateLimitError> {
        let mut admitted = false;
        self.inner
            .entry_by_ref(identity)
            .and_compute_with(|existing| {
                let current = existing
                    .map(|entry| entry.into_value())
                    .filter(|w| now < w.started_at.saturating_add(self.window_secs));
                let next = match current {
                    Some(w) if w.count >= self.max_requests => return Op::Nop,
                    Some(w) => Window {
                        count: w.count + 1,
                        ..w
                    },
                    None if self.max_requests == 0 => return Op::Nop,
                    None => Window {
                        started_at: now,
                        count: 1,
                    },
                };
                admitted = true;
                Op::Put(next)
            });
        Ok(admitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_applies_within_window() {
        let limiter = MokaRateLimiter::new(3, 100);
        for _ in 0..3 {
            assert!(limiter.try_admit("198.51.100.1", 1_000).unwrap());
        }
        assert!(!limiter.try_admit("198.51.100.1", 1_030).unwrap());
        assert!(!limiter.try_admit("198.51.100.1", 1_059).unwrap());
    }

    #[test]
    fn identities_are_counted_separately() {
        let limiter = MokaRateLimiter::new(1, 100);
        assert!(limiter.try_admit("a", 1_000).unwrap());
        assert!(!limiter.try_admit("a", 1_000).unwrap());
        assert!(limiter.try_admit("b", 1_000).unwrap());
    }

    #[test]
    fn window_resets_sixty_seconds_after_first_admission() {
        let limiter = MokaRateLimiter::new(2, 100);
        assert!(limiter.try_admit("a", 1_000).unwrap());
        assert!(limiter.try_admit("a", 1_050).unwrap());
        assert!(!limiter.try_admit("a", 1_059).unwrap());
        // window is fixed at the first admission, not extended by later ones
        assert!(limiter.try_admit("a", 1_060).unwrap());
        assert!(limiter.try_admit("a", 1_061).unwrap());
        assert!(!limiter.try_admit("a", 1_062).unwrap());
    }

    #[test]
    fn zero_ceiling_admits_nothing() {
        let limiter = MokaRateLimiter::new(0, 100);
        assert!(!limiter.try_admit("a", 1_000).unwrap());
    }
}
