//! Pricing configuration models
//!
//! Token prices used to estimate what a run cost.

use serde::{Deserialize, Serialize};

/// Prices in dollars per one million tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingConfig {
    /// Uncached input tokens
    #[serde(default = "default_input_per_mtok")]
    pub input_per_mtok: f64,
    /// Tokens written to the prompt cache
    #[serde(default = "default_cache_write_per_mtok")]
    pub cache_write_per_mtok: f64,
    /// Tokens served from the prompt cache
    #[serde(default = "default_cache_read_per_mtok")]
    pub cache_read_per_mtok: f64,
    /// Output tokens
    #[serde(default = "default_output_per_mtok")]
    pub output_per_mtok: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            input_per_mtok: default_input_per_mtok(),
            cache_write_per_mtok: default_cache_write_per_mtok(),
            cache_read_per_mtok: default_cache_read_per_mtok(),
            output_per_mtok: default_output_per_mtok(),
        }
    }
}

fn default_input_per_mtok() -> f64 {
    1.00
}

fn default_cache_write_per_mtok() -> f64 {
    1.25
}

fn default_cache_read_per_mtok() -> f64 {
    0.10
}

fn default_output_per_mtok() -> f64 {
    5.00
}
