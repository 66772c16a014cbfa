//! Client-side token bucket matching the upstream's documented admin rate.
//!
//! Pacing requests here keeps sustained traffic under the upstream's own
//! leaky bucket, so 429s only happen on genuine bursts and the `Retry-After`
//! path stays the exception.

use std::time::Duration;

use log::trace;
use tokio::{sync::Mutex, time::Instant};

pub struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A bucket that starts full with `capacity` tokens and refills at
    /// `refill_per_second`.
    pub fn new(capacity: u32, refill_per_second: f64) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            capacity,
            refill_per_second: refill_per_second.max(f64::MIN_POSITIVE),
            state: Mutex::new(BucketState { tokens: capacity, last_refill: Instant::now() }),
        }
    }

    /// Takes one token, sleeping until the refill makes one available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_per_second).min(self.capacity);
                state.last_refill = now;
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_second)
            };
            trace!("Token bucket empty; waiting {}ms", wait.as_millis());
            tokio::time::sleep(wait).await;
        }
    }
}
