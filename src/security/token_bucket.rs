//! Token bucket shared by the per-client and global limiters.

use tokio::time::Instant;

/// A simple token bucket.
///
/// Holds at most `burst` tokens, refilled continuously at `rate` tokens per
/// second. Uses the Tokio clock so a paused test runtime controls refill.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    burst: f64,
    rate: f64,
    last_update: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(rate_per_sec: f64, burst: u32) -> Self {
        let burst = f64::from(burst);
        Self {
            tokens: burst,
            burst,
            rate: rate_per_sec,
            last_update: Instant::now(),
        }
    }

    /// Refill for elapsed time, then consume one token if available.
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, without refilling.
    pub fn available(&self) -> f64 {
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_deny() {
        let mut bucket = TokenBucket::new(5.0, 30);
        for _ in 0..30 {
            assert!(bucket.try_acquire());
        }
        assert!(!bucket.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_is_capped_at_burst() {
        let mut bucket = TokenBucket::new(5.0, 3);
        for _ in 0..3 {
            assert!(bucket.try_acquire());
        }

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(bucket.try_acquire());
        assert!(bucket.available() <= 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_rate() {
        let mut bucket = TokenBucket::new(5.0, 1);
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());

        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(!bucket.try_acquire());

        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(bucket.try_acquire());
    }
}
