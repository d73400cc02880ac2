//! Configuration validation.
//!
//! Serde handles the syntax; this module checks that values make sense
//! together. Every problem is reported, not just the first one.

use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::schema::PortfolioConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not exceed {max}")]
    TooLarge { field: &'static str, max: u64 },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("validation.allowed_methods contains an invalid method: {0}")]
    InvalidMethod(String),

    #[error("rate_limit.cleanup_interval_secs must not exceed rate_limit.max_idle_secs")]
    CleanupSlowerThanIdle,
}

/// Longest request deadline accepted: one day.
pub const MAX_REQUEST_SECS: u64 = 24 * 60 * 60;

/// Longest idle threshold or sweep interval accepted: one week.
pub const MAX_IDLE_SECS: u64 = 7 * 24 * 60 * 60;

/// Validate a parsed configuration.
pub fn validate_config(config: &PortfolioConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut non_zero = |field: &'static str, value: u64| {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    };

    non_zero("timeouts.request_secs", config.timeouts.request_secs);
    non_zero("timeouts.operation_ms", config.timeouts.operation_ms);
    non_zero("rate_limit.requests_per_second", config.rate_limit.requests_per_second.into());
    non_zero("rate_limit.burst_size", config.rate_limit.burst_size.into());
    non_zero("rate_limit.cleanup_interval_secs", config.rate_limit.cleanup_interval_secs);
    non_zero("rate_limit.max_idle_secs", config.rate_limit.max_idle_secs);
    non_zero(
        "global_rate_limit.requests_per_minute",
        config.global_rate_limit.requests_per_minute.into(),
    );
    non_zero("global_rate_limit.burst_size", config.global_rate_limit.burst_size.into());
    non_zero("concurrency.max_in_flight", config.concurrency.max_in_flight as u64);
    non_zero("concurrency.acquire_timeout_ms", config.concurrency.acquire_timeout_ms);
    non_zero("validation.max_url_length", config.validation.max_url_length as u64);
    non_zero("validation.max_header_count", config.validation.max_header_count as u64);
    non_zero(
        "validation.max_header_name_length",
        config.validation.max_header_name_length as u64,
    );
    non_zero(
        "validation.max_header_value_length",
        config.validation.max_header_value_length as u64,
    );
    non_zero("validation.max_body_size", config.validation.max_body_size);

    let mut at_most = |field: &'static str, value: u64, max: u64| {
        if value > max {
            errors.push(ValidationError::TooLarge { field, max });
        }
    };

    at_most("timeouts.request_secs", config.timeouts.request_secs, MAX_REQUEST_SECS);
    at_most("timeouts.operation_ms", config.timeouts.operation_ms, MAX_REQUEST_SECS * 1000);
    at_most(
        "concurrency.acquire_timeout_ms",
        config.concurrency.acquire_timeout_ms,
        MAX_REQUEST_SECS * 1000,
    );
    at_most(
        "concurrency.max_in_flight",
        config.concurrency.max_in_flight as u64,
        Semaphore::MAX_PERMITS as u64,
    );
    at_most(
        "rate_limit.cleanup_interval_secs",
        config.rate_limit.cleanup_interval_secs,
        MAX_IDLE_SECS,
    );
    at_most("rate_limit.max_idle_secs", config.rate_limit.max_idle_secs, MAX_IDLE_SECS);

    if config.rate_limit.cleanup_interval_secs > config.rate_limit.max_idle_secs {
        errors.push(ValidationError::CleanupSlowerThanIdle);
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    for method in &config.validation.allowed_methods {
        if method.parse::<Method>().is_err() {
            errors.push(ValidationError::InvalidMethod(method.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
