//! Per-endpoint rate limiting, keyed by client IP.
//!
//! # Numeric IP key collisions
//!
//! IPv4 peers are bucketed by concatenating the decimal digits of each
//! octet into a single integer (`192.168.1.1` -> `192168` `1` `1` ->
//! `1921681`1`... parsed as one number), exactly as the original
//! implementation does. This means distinct addresses can share a bucket
//! (e.g. `1.22.3.4` and `12.2.3.4` both concatenate to `1223.4`'s digit
//! stream); that collision is preserved deliberately for behavioral parity
//! rather than silently tightened, since it only ever makes the limiter
//! *more* conservative (two IPs sharing a budget), never less. IPv6 peers
//! have no four-octet decimal form to reuse, so they get a supplemental
//! scheme: hash the full 16-byte address into the same key space.

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    net::IpAddr,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Requests-per-window budget for a single endpoint.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

pub(crate) struct RateLimiter {
    config: RateLimit,
    buckets: Mutex<HashMap<u64, (u32, Instant)>>,
}

impl RateLimiter {
    pub(crate) fn new(config: RateLimit) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the request for `addr` is within budget (and counts
    /// it against the bucket), `false` if the caller should be rejected.
    pub(crate) fn check(&self, addr: IpAddr) -> bool {
        let key = bucket_key(addr);
        let now = Instant::now();

        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let entry = buckets.entry(key).or_insert((0, now));

        if now.duration_since(entry.1) >= self.config.window {
            *entry = (0, now);
        }

        if entry.0 >= self.config.max_requests {
            false
        } else {
            entry.0 += 1;
            true
        }
    }
}

fn bucket_key(addr: IpAddr) -> u64 {
    match addr {
        IpAddr::V4(v4) => {
            let mut digits = String::with_capacity(12);
            for octet in v4.octets() {
                digits.push_str(&octet.to_string());
            }
            digits.parse().unwrap_or_else(|_| hash_fallback(&v4.octets()))
        }
        IpAddr::V6(v6) => hash_fallback(&v6.octets()),
    }
}

fn hash_fallback(bytes: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(RateLimit::new(3, Duration::from_secs(60)));
        let addr: IpAddr = "127.0.0.1".parse().unwrap();

        assert!(limiter.check(addr));
        assert!(limiter.check(addr));
        assert!(limiter.check(addr));
        assert!(!limiter.check(addr));
    }

    #[test]
    fn distinct_ips_have_independent_budgets() {
        let limiter = RateLimiter::new(RateLimit::new(1, Duration::from_secs(60)));
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(a));
        assert!(limiter.check(b));
        assert!(!limiter.check(a));
    }

    #[test]
    fn ipv4_digit_concatenation_can_collide_by_design() {
        // 1.1.22.3 and 1.11.2.23 both concatenate their octets to "11223".
        let a: IpAddr = "1.1.22.3".parse().unwrap();
        let b: IpAddr = "1.11.2.23".parse().unwrap();
        assert_eq!(bucket_key(a), bucket_key(b));
    }
}
