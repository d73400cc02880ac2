//! Process-wide rate limiting.
//!
//! A single token bucket caps total admitted throughput regardless of which
//! client is asking. The bucket serializes internally, so callers share one
//! instance behind an `Arc` without any outside locking.

use std::sync::{Mutex, PoisonError};

use crate::config::GlobalRateLimitConfig;
use crate::security::token_bucket::TokenBucket;

#[derive(Debug)]
pub struct GlobalRateLimiter {
    bucket: Mutex<TokenBucket>,
    per_minute: u32,
    burst: u32,
}

impl GlobalRateLimiter {
    pub fn new(config: &GlobalRateLimitConfig) -> Self {
        Self::per_minute(config.requests_per_minute, config.burst_size)
    }

    /// Allow `per_minute` sustained events with bursts of up to `burst`.
    pub fn per_minute(per_minute: u32, burst: u32) -> Self {
        let rate_per_sec = f64::from(per_minute) / 60.0;
        Self {
            bucket: Mutex::new(TokenBucket::new(rate_per_sec, burst)),
            per_minute,
            burst,
        }
    }

    pub fn allow(&self) -> bool {
        self.bucket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_acquire()
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.per_minute
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }
}
