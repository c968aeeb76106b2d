//! Dispatch loop configuration

use super::*;
use serde::{Deserialize, Serialize};

/// Batch sizing, concurrency bounds and retry budget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchConfig {
    /// Maximum records per upstream request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Concurrency level at the start of a run
    #[serde(default = "default_initial_concurrency")]
    pub initial_concurrency: usize,
    /// Floor the level never shrinks below
    #[serde(default = "default_min_concurrency")]
    pub min_concurrency: usize,
    /// Ceiling the level never grows past
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Retries per item at the dispatch level, and per request at the transport level
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Exponential backoff base
    #[serde(default = "default_retry_backoff_base")]
    pub retry_backoff_base: u32,
    /// Delay unit multiplied by `retry_backoff_base ^ attempt`
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Upper bound of the uniform jitter added to every backoff
    #[serde(default = "default_retry_jitter_ms")]
    pub retry_jitter_ms: u64,
    /// How often a wave with failed batches shrinks the concurrency level
    #[serde(default)]
    pub shrink_policy: ShrinkPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            initial_concurrency: default_initial_concurrency(),
            min_concurrency: default_min_concurrency(),
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            retry_backoff_base: default_retry_backoff_base(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_jitter_ms: default_retry_jitter_ms(),
            shrink_policy: ShrinkPolicy::default(),
        }
    }
}

/// When the dispatch loop shrinks after batch-level failures
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShrinkPolicy {
    /// One shrink per wave containing at least one failed batch
    #[default]
    PerWave,
    /// One shrink per failed batch
    PerBatch,
}
