//! Token bucket pacing for publish batches.
//!
//! Tokens refill continuously at `rate` per second up to `burst`. `acquire`
//! waits on the injected clock until one token is available, so a batch never
//! exceeds the configured request rate.

use crate::clock::Clock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Token bucket rate limiter, local to one publish batch.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    /// Current token count.
    tokens: f64,
    /// Maximum tokens (burst capacity).
    max_tokens: f64,
    /// Tokens added per second.
    refill_rate: f64,
    /// Last time tokens were updated.
    last_update: Instant,
}

impl RateLimiter {
    /// Limiter allowing `rate_per_sec` requests per second with a burst of one.
    ///
    /// A rate of zero is treated as one request per second.
    pub fn per_second(rate_per_sec: u32, clock: Arc<dyn Clock>) -> Self {
        Self::with_burst(rate_per_sec, 1, clock)
    }

    /// Limiter with an explicit burst capacity.
    pub fn with_burst(rate_per_sec: u32, burst: u32, clock: Arc<dyn Clock>) -> Self {
        let max_tokens = f64::from(burst.max(1));
        let last_update = clock.now();
        Self {
            clock,
            tokens: max_tokens,
            max_tokens,
            refill_rate: f64::from(rate_per_sec.max(1)),
            last_update,
        }
    }

    fn refill(&mut self) {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_update = now;
    }

    /// Consume a token if one is available right now.
    pub fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Wait until a token is available, then consume it.
    pub async fn acquire(&mut self) {
        loop {
            if self.try_acquire() {
                return;
            }
            let deficit = 1.0 - self.tokens;
            let wait = Duration::from_secs_f64(deficit / self.refill_rate);
            // guard against a zero-length wait caused by float rounding
            self.clock.sleep(wait.max(Duration::from_micros(1))).await;
        }
    }

    /// Current token count after refill.
    pub fn available(&mut self) -> f64 {
        self.refill();
        self.tokens
    }
}
