//! Per-client token bucket rate limiting

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Above this many tracked clients, idle buckets are dropped before inserting
const MAX_TRACKED_CLIENTS: usize = 10_000;
const IDLE_EVICTION: Duration = Duration::from_secs(60);

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    const fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = elapsed.mul_add(refill_rate, self.tokens).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token buckets keyed by client IP
pub struct RateLimiter {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    requests_per_second: f64,
    burst: f64,
}

impl RateLimiter {
    /// `burst` is the bucket capacity; it is raised to at least one request
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            requests_per_second: f64::from(requests_per_second),
            burst: f64::from(burst.max(1)),
        }
    }

    /// Take one token for `client`, returns false when the client is over its limit
    pub fn check(&self, client: IpAddr) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if buckets.len() >= MAX_TRACKED_CLIENTS && !buckets.contains_key(&client) {
            buckets.retain(|_, bucket| now.duration_since(bucket.last_update) < IDLE_EVICTION);
        }

        buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(self.burst, now))
            .try_acquire(self.burst, self.requests_per_second, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_burst_then_reject() {
        let limiter = RateLimiter::new(1, 3);
        assert!(limiter.check(ip(1)));
        assert!(limiter.check(ip(1)));
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1, 1);
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
        assert!(limiter.check(ip(2)));
    }

    #[test]
    fn test_refill() {
        let limiter = RateLimiter::new(100, 1);
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(ip(1)));
    }

    #[test]
    fn test_bucket_refill_capped_at_capacity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(2.0, start);
        let later = start + Duration::from_secs(10);
        assert!(bucket.try_acquire(2.0, 5.0, later));
        assert!(bucket.try_acquire(2.0, 5.0, later));
        assert!(!bucket.try_acquire(2.0, 5.0, later));
    }
}
