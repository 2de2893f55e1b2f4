//! Rate Limiter (Token Bucket Algorithm)
//!
//! Limits admin requests per second. Tokens are kept in fixed point
//! (1/1000 token) so slow refill rates still accumulate.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

const MILLI: u64 = 1000;

/// Rate limiter using the token bucket algorithm
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    max_tokens: u32,
    refill_rate: u32, // tokens per second
}

struct Bucket {
    milli_tokens: u64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// Allow 100 requests/sec with burst of 200:
    /// `RateLimiter::new(200, 100)`
    pub fn new(max_tokens: u32, refill_rate: u32) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                milli_tokens: max_tokens as u64 * MILLI,
                last_refill: Instant::now(),
            }),
            max_tokens,
            refill_rate,
        }
    }

    /// Consume one token; false if the caller is rate limited
    pub fn check(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        self.refill(&mut bucket);

        if bucket.milli_tokens >= MILLI {
            bucket.milli_tokens -= MILLI;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available
    pub fn remaining(&self) -> u32 {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        self.refill(&mut bucket);
        (bucket.milli_tokens / MILLI) as u32
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(bucket.last_refill).as_millis() as u64;
        if elapsed_ms == 0 {
            return;
        }
        // refill_rate tokens/s == refill_rate milli-tokens/ms
        let added = elapsed_ms * self.refill_rate as u64;
        let cap = self.max_tokens as u64 * MILLI;
        bucket.milli_tokens = (bucket.milli_tokens + added).min(cap);
        bucket.last_refill = now;
    }
}
