//! Exponential backoff with jitter

use crate::config::DispatchConfig;
use rand::Rng;
use std::time::Duration;

/// Retry schedule for one batch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: u32,
    pub unit_ms: u64,
    pub jitter_ms: u64,
    pub max_retries: u32,
}

impl BackoffPolicy {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            base: config.retry_backoff_base,
            unit_ms: config.retry_base_delay_ms,
            jitter_ms: config.retry_jitter_ms,
            max_retries: config.max_retries,
        }
    }

    /// Deterministic part of the delay after the given (0-based) failed attempt
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.base).saturating_pow(attempt);
        Duration::from_millis(factor.saturating_mul(self.unit_ms))
    }

    /// `base^attempt * unit + uniform(0, jitter)`
    pub fn delay_for<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rng.gen_range(0..=self.jitter_ms)
        };
        self.base_delay(attempt) + Duration::from_millis(jitter)
    }

    /// Whether another attempt is allowed after `attempt` failed
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}
