//! Token-bucket admission control for the write path.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Shared token bucket; a budget of 0 admits everything.
pub struct RateLimiter {
    /// tokens per second, also the burst capacity
    qps: u32,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(qps: u32) -> Self {
        RateLimiter {
            qps,
            bucket: Mutex::new(Bucket {
                tokens: qps as f64,
                refilled_at: Instant::now(),
            }),
        }
    }

    fn try_take(&self, permits: u32) -> bool {
        let mut bucket = self.bucket.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.refilled_at = now;
        bucket.tokens = (bucket.tokens + elapsed * self.qps as f64).min(self.qps as f64);
        if bucket.tokens >= permits as f64 {
            bucket.tokens -= permits as f64;
            true
        } else {
            false
        }
    }

    /// Acquire `permits`, waiting up to `timeout`; false when the budget
    /// never becomes available in time.
    pub async fn try_acquire(&self, permits: u32, timeout: Duration) -> bool {
        if self.qps == 0 {
            return true;
        }
        let deadline = Instant::now() + timeout;
        loop {
            if self.try_take(permits) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_budget_is_unlimited() {
        let limiter = RateLimiter::new(0);
        for _ in 0..1000 {
            assert!(limiter.try_acquire(100, Duration::from_millis(1)).await);
        }
    }

    #[tokio::test]
    async fn exhausted_bucket_rejects_within_timeout() {
        let limiter = RateLimiter::new(10);
        // drain the initial burst
        assert!(limiter.try_acquire(10, Duration::from_millis(1)).await);
        // far more than one second of budget cannot arrive in 30ms
        assert!(!limiter.try_acquire(10, Duration::from_millis(30)).await);
    }

    #[tokio::test]
    async fn bucket_refills_over_time() {
        let limiter = RateLimiter::new(1000);
        assert!(limiter.try_acquire(1000, Duration::from_millis(1)).await);
        // ~100ms refills ~100 tokens
        assert!(limiter.try_acquire(50, Duration::from_millis(500)).await);
    }
}
