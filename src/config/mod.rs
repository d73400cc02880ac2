//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, PORT / ALLOWED_ORIGINS overrides)
//!     → validation.rs (semantic checks)
//!     → PortfolioConfig (validated, immutable)
//!     → handed to the pipeline and server at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ConcurrencyConfig, ContentConfig, GlobalRateLimitConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, PortfolioConfig, RateLimitConfig, SecurityConfig, TimeoutConfig,
    ValidationConfig,
};
