//! Token-bucket rate limiter keyed by chat author.
//!
//! Each author starts with a full bucket of `max_tokens`; one token comes
//! back every `refill_interval`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ctbot_config::RateLimitSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Burst size per author.
    pub max_tokens: u32,

    /// One token is refilled per interval.
    pub refill_interval: Duration,
}

impl RateLimitConfig {
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self {
            max_tokens: settings.max_tokens,
            refill_interval: Duration::from_secs(settings.refill_secs),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: HashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: HashMap::new(),
        }
    }

    /// Take one token for `author`. Returns `false` when the bucket is empty.
    pub fn try_acquire(&mut self, author: &str) -> bool {
        self.try_acquire_at(author, Instant::now())
    }

    fn try_acquire_at(&mut self, author: &str, now: Instant) -> bool {
        let max = self.config.max_tokens;
        let interval = self.config.refill_interval;
        let bucket = self.buckets.entry(author.to_string()).or_insert(Bucket {
            tokens: max,
            last_refill: now,
        });

        if !interval.is_zero() {
            let elapsed = now.saturating_duration_since(bucket.last_refill);
            let refills = (elapsed.as_nanos() / interval.as_nanos()).min(u128::from(max)) as u32;
            if refills > 0 {
                bucket.tokens = bucket.tokens.saturating_add(refills).min(max);
                // A full bucket restarts the clock; otherwise the partial interval carries over.
                bucket.last_refill = if bucket.tokens == max {
                    now
                } else {
                    bucket.last_refill + interval.saturating_mul(refills)
                };
            }
        } else {
            bucket.tokens = max;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Tokens left for `author`; unseen authors have a full bucket.
    pub fn remaining(&self, author: &str) -> u32 {
        self.buckets
            .get(author)
            .map_or(self.config.max_tokens, |b| b.tokens)
    }

    /// Forget authors whose buckets would be full again by now.
    pub fn cleanup(&mut self) {
        let now = Instant::now();
        let max = self.config.max_tokens;
        let interval = self.config.refill_interval;
        self.buckets.retain(|_, b| {
            let missing = max.saturating_sub(b.tokens);
            now.saturating_duration_since(b.last_refill) < interval.saturating_mul(missing)
        });
    }

    pub fn tracked_authors(&self) -> usize {
        self.buckets.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn limiter(max_tokens: u32, refill_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_tokens,
            refill_interval: Duration::from_secs(refill_secs),
        })
    }

    #[test]
    fn test_burst_then_block() {
        let mut limiter = limiter(3, 60);
        assert!(limiter.try_acquire("alice"));
        assert!(limiter.try_acquire("alice"));
        assert!(limiter.try_acquire("alice"));
        assert!(!limiter.try_acquire("alice"));
    }

    #[test]
    fn test_authors_are_independent() {
        let mut limiter = limiter(1, 60);
        assert!(limiter.try_acquire("alice"));
        assert!(!limiter.try_acquire("alice"));
        assert!(limiter.try_acquire("bob"));
    }

    #[test]
    fn test_refill_over_time() {
        let mut limiter = limiter(2, 3);
        let start = Instant::now();
        assert!(limiter.try_acquire_at("alice", start));
        assert!(limiter.try_acquire_at("alice", start));
        assert!(!limiter.try_acquire_at("alice", start + Duration::from_secs(2)));
        assert!(limiter.try_acquire_at("alice", start + Duration::from_secs(3)));
        assert!(!limiter.try_acquire_at("alice", start + Duration::from_secs(4)));
    }

    #[test]
    fn test_partial_interval_is_carried() {
        let mut limiter = limiter(2, 3);
        let start = Instant::now();
        assert!(limiter.try_acquire_at("alice", start));
        assert!(limiter.try_acquire_at("alice", start));
        assert!(limiter.try_acquire_at("alice", start + Duration::from_secs(4)));
        // Two more seconds complete the second interval counted from `start`.
        assert!(limiter.try_acquire_at("alice", start + Duration::from_secs(6)));
    }

    #[test]
    fn test_refill_caps_at_max() {
        let mut limiter = limiter(2, 1);
        let start = Instant::now();
        assert!(limiter.try_acquire_at("alice", start));
        assert!(limiter.try_acquire_at("alice", start + Duration::from_secs(100)));
        assert_eq!(limiter.remaining("alice"), 1);
    }

    #[test]
    fn test_remaining_tokens() {
        let mut limiter = limiter(5, 60);
        assert_eq!(limiter.remaining("alice"), 5);
        limiter.try_acquire("alice");
        limiter.try_acquire("alice");
        assert_eq!(limiter.remaining("alice"), 3);
    }

    #[test]
    fn test_cleanup_keeps_drained_buckets() {
        let mut limiter = limiter(5, 60);
        limiter.try_acquire("alice");
        limiter.cleanup();
        assert_eq!(limiter.tracked_authors(), 1);
    }

    #[test]
    fn test_cleanup_drops_refilled_buckets() {
        let mut limiter = RateLimiter::new(RateLimitConfig {
            max_tokens: 1,
            refill_interval: Duration::ZERO,
        });
        limiter.try_acquire("alice");
        limiter.cleanup();
        assert_eq!(limiter.tracked_authors(), 0);
    }

    #[test]
    fn test_huge_interval_does_not_overflow() {
        let mut limiter = RateLimiter::new(RateLimitConfig {
            max_tokens: u32::MAX,
            refill_interval: Duration::MAX,
        });
        let start = Instant::now();
        assert!(limiter.try_acquire_at("alice", start));
        assert!(limiter.try_acquire_at("alice", start + Duration::from_secs(3600)));
        assert_eq!(limiter.remaining("alice"), u32::MAX - 2);
        limiter.cleanup();
        assert_eq!(limiter.tracked_authors(), 1);
    }

    #[test]
    fn test_default_matches_config_defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_tokens, 5);
        assert_eq!(config.refill_interval, Duration::from_secs(3));
    }
}
