use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::config::RateLimitPolicy;

/// Buckets beyond this count trigger a sweep of idle clients.
const MAX_TRACKED_CLIENTS: usize = 10_000;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket per client key: `capacity` requests per `window`, refilled
/// continuously.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub(crate) fn new(capacity: u32, window: Duration) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            refill_per_sec: capacity / window.as_secs_f64().max(f64::EPSILON),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Takes one token for `key`. On refusal returns how long until the next
    /// token is available.
    pub(crate) async fn acquire(&self, key: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;

        if buckets.len() > MAX_TRACKED_CLIENTS {
            let (capacity, refill) = (self.capacity, self.refill_per_sec);
            buckets.retain(|_, b| {
                b.tokens + now.duration_since(b.last_refill).as_secs_f64() * refill < capacity
            });
        }

        let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else if self.refill_per_sec > 0.0 {
            let wait = (1.0 - bucket.tokens) / self.refill_per_sec;
            Err(Duration::try_from_secs_f64(wait).unwrap_or(Duration::MAX))
        } else {
            Err(Duration::MAX)
        }
    }
}

#[derive(Debug)]
pub(crate) struct RateLimiters {
    pub(crate) requests: RateLimiter,
    pub(crate) mutations: RateLimiter,
}

impl RateLimiters {
    pub(crate) fn new(policy: &RateLimitPolicy) -> Self {
        Self {
            requests: RateLimiter::new(policy.max_requests, policy.window),
            mutations: RateLimiter::new(policy.max_mutations, policy.window),
        }
    }
}

/// Whole seconds a client should wait, never less than one.
pub(crate) fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs_f64().ceil();
    if secs >= u64::MAX as f64 {
        u64::MAX
    } else {
        (secs as u64).max(1)
    }
}
