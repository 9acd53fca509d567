//! Per-client token bucket used to throttle login attempts.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// Buckets untouched this long are dropped once the map grows large.
const IDLE_EVICTION: Duration = Duration::from_secs(600);
const PRUNE_THRESHOLD: usize = 1024;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Rate limiter keyed by client address.
pub struct LoginThrottle {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    capacity: f64,
    refill_per_sec: f64,
}

impl LoginThrottle {
    /// Allow `per_minute` attempts per client, refilled continuously.
    pub fn per_minute(per_minute: u32) -> Self {
        let capacity = f64::from(per_minute.max(1));
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity,
            refill_per_sec: capacity / 60.0,
        }
    }

    /// Take one attempt for `client`. False when the bucket is empty.
    pub fn check(&self, client: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        if buckets.len() > PRUNE_THRESHOLD {
            buckets.retain(|_, b| b.last_update.elapsed() < IDLE_EVICTION);
        }
        let capacity = self.capacity;
        buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(capacity))
            .try_acquire(capacity, self.refill_per_sec)
    }
}
