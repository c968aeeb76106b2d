//! Dispatch, cache and pricing validators

use super::trait_def::Validate;
use crate::config::models::*;

/// Highest concurrency level a run may be configured with
pub const MAX_CONCURRENCY_LIMIT: usize = 1000;

/// Highest per-item retry budget
pub const MAX_RETRIES_LIMIT: u32 = 32;

impl Validate for DispatchConfig {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("Batch size must be greater than 0".to_string());
        }

        if self.min_concurrency == 0 {
            return Err("Minimum concurrency must be greater than 0".to_string());
        }

        if self.min_concurrency > self.max_concurrency {
            return Err(format!(
                "Minimum concurrency ({}) cannot exceed maximum concurrency ({})",
                self.min_concurrency, self.max_concurrency
            ));
        }

        if self.max_concurrency > MAX_CONCURRENCY_LIMIT {
            return Err(format!(
                "Maximum concurrency ({}) cannot exceed {}",
                self.max_concurrency, MAX_CONCURRENCY_LIMIT
            ));
        }

        if self.initial_concurrency < self.min_concurrency
            || self.initial_concurrency > self.max_concurrency
        {
            return Err(format!(
                "Initial concurrency ({}) must be within [{}, {}]",
                self.initial_concurrency, self.min_concurrency, self.max_concurrency
            ));
        }

        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(format!(
                "Max retries ({}) cannot exceed {}",
                self.max_retries, MAX_RETRIES_LIMIT
            ));
        }

        if self.retry_backoff_base == 0 {
            return Err("Retry backoff base must be at least 1".to_string());
        }

        Ok(())
    }
}

impl Validate for CacheConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.ttl_ms == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Validate for PromptConfig {
    fn validate(&self) -> Result<(), String> {
        if self.inline_prompt().is_none() && self.system_prompt_file.is_none() {
            return Err("Either system_prompt or system_prompt_file must be set".to_string());
        }

        if self.results_key.trim().is_empty() {
            return Err("Results key cannot be empty".to_string());
        }

        if self.fields.iter().any(|field| field.trim().is_empty()) {
            return Err("Rendered field names cannot be empty".to_string());
        }

        Ok(())
    }
}

impl Validate for PricingConfig {
    fn validate(&self) -> Result<(), String> {
        let prices = [
            ("input", self.input_per_mtok),
            ("cache write", self.cache_write_per_mtok),
            ("cache read", self.cache_read_per_mtok),
            ("output", self.output_per_mtok),
        ];

        for (name, price) in prices {
            if !price.is_finite() || price < 0.0 {
                return Err(format!("The {} price must be a non-negative number", name));
            }
        }

        Ok(())
    }
}
