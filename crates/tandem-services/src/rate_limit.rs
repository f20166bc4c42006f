//! Rate limiting: token buckets keyed by client address.
//!
//! Three buckets are in play at the edge:
//!   api          every `/api/*` request (100 per 15 min by default)
//!   reports      `POST /api/report` (5 per minute)
//!   connections  WebSocket upgrades (10 per minute)
//!
//! Each request costs 1 token. Empty bucket = 429.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::clock::Clock;

#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    /// Tokens per second.
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A bucket that admits `capacity` requests per `window`, starting full.
    pub fn new(capacity: u32, window: Duration, now: Instant) -> Self {
        let capacity = f64::from(capacity.max(1));
        let window = window.as_secs_f64().max(f64::EPSILON);
        Self {
            tokens: capacity,
            capacity,
            refill_rate: capacity / window,
            last_refill: now,
        }
    }

    /// Returns true if the request may proceed.
    pub fn allow_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens.min(self.capacity)
    }
}

/// One bucket per client address.
#[derive(Clone)]
pub struct KeyedLimiter {
    name: &'static str,
    capacity: u32,
    window: Duration,
    buckets: Arc<DashMap<IpAddr, TokenBucket>>,
    clock: Arc<dyn Clock>,
}

impl KeyedLimiter {
    pub fn new(name: &'static str, capacity: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            capacity,
            window,
            buckets: Arc::new(DashMap::new()),
            clock,
        }
    }

    pub fn check(&self, addr: IpAddr) -> bool {
        let now = self.clock.now();
        let allowed = self
            .buckets
            .entry(addr)
            .or_insert_with(|| TokenBucket::new(self.capacity, self.window, now))
            .allow_at(now);
        if !allowed {
            tracing::warn!(limiter = self.name, %addr, "rate limit exceeded");
        }
        allowed
    }

    /// Forget buckets that have been idle long enough to be full again.
    pub fn purge_idle(&self) -> usize {
        let now = self.clock.now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < self.window);
        before - self.buckets.len()
    }

    pub fn tracked(&self) -> usize {
        self.buckets.len()
    }
}
