//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the portfolio API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PortfolioConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-client rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Process-wide rate limiting configuration.
    pub global_rate_limit: GlobalRateLimitConfig,

    /// Concurrency admission gate configuration.
    pub concurrency: ConcurrencyConfig,

    /// Request validation ceilings.
    pub validation: ValidationConfig,

    /// Response hardening and CORS.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Content source.
    pub content: ContentConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request deadline (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Budget for a single content store operation in milliseconds.
    pub operation_ms: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn operation(&self) -> Duration {
        Duration::from_millis(self.operation_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            operation_ms: 10_000,
        }
    }
}

/// Per-client rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable per-client rate limiting.
    pub enabled: bool,

    /// Sustained requests per second per client.
    pub requests_per_second: u32,

    /// Burst capacity per client.
    pub burst_size: u32,

    /// How often idle client buckets are swept, in seconds.
    pub cleanup_interval_secs: u64,

    /// Inactivity after which a client bucket is evicted, in seconds.
    pub max_idle_secs: u64,
}

impl RateLimitConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn max_idle(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 5,
            burst_size: 30,
            cleanup_interval_secs: 15 * 60,
            max_idle_secs: 60 * 60,
        }
    }
}

/// Process-wide rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalRateLimitConfig {
    /// Enable the global limiter.
    pub enabled: bool,

    /// Sustained requests per minute across all clients.
    pub requests_per_minute: u32,

    /// Burst capacity before smoothing to the minute rate.
    pub burst_size: u32,
}

impl Default for GlobalRateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 1000,
            burst_size: 200,
        }
    }
}

/// Concurrency admission gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Maximum requests executing at once.
    pub max_in_flight: usize,

    /// How long a request may wait for a free slot, in milliseconds.
    pub acquire_timeout_ms: u64,
}

impl ConcurrencyConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 50,
            acquire_timeout_ms: 50,
        }
    }
}

/// Request validation ceilings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum length of the request target (path and query).
    pub max_url_length: usize,

    /// Maximum number of distinct header names.
    pub max_header_count: usize,

    /// Maximum length of a header name.
    pub max_header_name_length: usize,

    /// Maximum length of a single header value.
    pub max_header_value_length: usize,

    /// Maximum declared body size in bytes.
    pub max_body_size: u64,

    /// Methods accepted by the pipeline.
    pub allowed_methods: Vec<String>,

    /// Content types accepted for requests carrying a body.
    pub allowed_content_types: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_url_length: 1000,
            max_header_count: 50,
            max_header_name_length: 100,
            max_header_value_length: 8192,
            max_body_size: 1024 * 1024, // 1MB
            allowed_methods: vec!["GET".into(), "HEAD".into(), "OPTIONS".into()],
            allowed_content_types: vec!["application/json".into()],
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security response headers.
    pub enable_headers: bool,

    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            allowed_origins: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Content source configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ContentConfig {
    /// JSON file with portfolio content. Built-in sample content when unset.
    pub data_path: Option<PathBuf>,
}
