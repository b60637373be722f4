use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

const MIN_REFILL_PER_SECOND: f64 = 0.001;

/// Classic token bucket on tokio's clock, so paused-time tests observe
/// the same refill schedule as production.
///
/// Starts full. `acquire` waits until one whole token is available and
/// takes it; waiters are served in lock order.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_second: f64) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            capacity,
            refill_per_second: refill_per_second.max(MIN_REFILL_PER_SECOND),
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        loop {
            self.refill(&mut state);
            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                return;
            }
            let missing = 1.0 - state.tokens;
            let wait = Duration::from_secs_f64(missing / self.refill_per_second);
            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_second).min(self.capacity);
        state.last_refill = now;
    }
}
