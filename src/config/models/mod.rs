//! Configuration data models
//!
//! This module defines all configuration structures used by the engine.

#![allow(missing_docs)]

pub mod cache;
pub mod dispatch;
pub mod endpoint;
pub mod pricing;
pub mod prompt;

// Re-export all configuration types
pub use cache::*;
pub use dispatch::*;
pub use endpoint::*;
pub use pricing::*;
pub use prompt::*;

/// Default records per batch
pub fn default_batch_size() -> usize {
    5
}

/// Default starting concurrency
pub fn default_initial_concurrency() -> usize {
    10
}

/// Default concurrency floor
pub fn default_min_concurrency() -> usize {
    2
}

/// Default concurrency ceiling
pub fn default_max_concurrency() -> usize {
    20
}

/// Default maximum retry attempts
pub fn default_max_retries() -> u32 {
    5
}

/// Default exponential backoff base
pub fn default_retry_backoff_base() -> u32 {
    2
}

/// Default backoff unit in milliseconds
pub fn default_retry_base_delay_ms() -> u64 {
    1000
}

/// Default jitter ceiling in milliseconds
pub fn default_retry_jitter_ms() -> u64 {
    100
}

/// Default endpoint, a locally running credential-forwarding proxy
pub fn default_endpoint_url() -> String {
    "http://localhost:8080/api/messages".to_string()
}

/// Default model
pub fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

/// Default output budget per batch
pub fn default_max_tokens() -> u32 {
    16000
}

/// Default output budget for the warm-up request
pub fn default_prime_max_tokens() -> u32 {
    16
}

/// Default request timeout in seconds
pub fn default_request_timeout_secs() -> u64 {
    300
}

/// Default connect timeout in seconds
pub fn default_connect_timeout_secs() -> u64 {
    10
}

/// Default prompt cache TTL (5 minutes)
pub fn default_cache_ttl_ms() -> u64 {
    5 * 60 * 1000
}

/// Default results array key
pub fn default_results_key() -> String {
    "reviews".to_string()
}

pub fn default_true() -> bool {
    true
}
