//! Prompt cache configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Server-side prompt cache warm-up settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Prime the cache before a run when it has gone stale
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How long a successful prime is trusted, in milliseconds
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: default_cache_ttl_ms(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}
