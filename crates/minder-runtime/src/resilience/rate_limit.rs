//! Token-bucket rate limiting.
//!
//! One bucket guards all calls to a provider instance, including judge
//! calls. It is the only synchronized resource shared between concurrent
//! case evaluations.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Rate limit settings: burst capacity plus sustained refill rate.
#[derive(Debug, Clone)]
pub struct RateLimit {
    /// Tokens available at burst. Must be at least 1.
    pub capacity: u32,

    /// Tokens added per second. Must be positive.
    pub refill_per_sec: f64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            capacity: 5,
            refill_per_sec: 5.0,
        }
    }
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket. Starts full.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(limit: &RateLimit) -> Self {
        debug_assert!(limit.capacity >= 1, "bucket capacity must be at least 1");
        debug_assert!(limit.refill_per_sec > 0.0, "refill rate must be positive");

        let capacity = f64::from(limit.capacity.max(1));
        Self {
            capacity,
            refill_per_sec: limit.refill_per_sec.max(f64::MIN_POSITIVE),
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            state.last_refill = now;
        }
    }

    /// Take a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Take a token, waiting for the bucket to refill if necessary.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock();
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                let deficit = 1.0 - state.tokens;
                Duration::from_secs_f64(deficit / self.refill_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }
}
