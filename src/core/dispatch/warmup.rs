//! Warm-up Cache Controller
//!
//! Tracks when the shared instructions were last loaded into the endpoint's
//! prompt cache and re-primes once the entry has likely expired.

use super::encoder::BatchEncoder;
use super::transport::MessagesEndpoint;
use crate::config::CacheConfig;
use crate::core::messages::Usage;
use parking_lot::Mutex;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Freshness of the server-side prompt cache
#[derive(Debug)]
pub struct PromptCache {
    /// Time of the last confirmed prime; written only on success
    last_prime: Mutex<Option<Instant>>,
    ttl: Duration,
}

impl PromptCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            last_prime: Mutex::new(None),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Age of the cache entry, `None` if never primed
    pub fn age(&self) -> Option<Duration> {
        self.last_prime.lock().map(|at| at.elapsed())
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Instant::now())
    }

    /// True if never primed or the last prime is older than the TTL
    pub fn is_stale_at(&self, now: Instant) -> bool {
        match *self.last_prime.lock() {
            None => true,
            Some(at) => now.saturating_duration_since(at) > self.ttl,
        }
    }

    pub(crate) fn mark_primed_at(&self, at: Instant) {
        *self.last_prime.lock() = Some(at);
    }

    /// Send the instructions-only request. Failures are logged and swallowed.
    ///
    /// Returns whether the cache was confirmed primed.
    pub async fn prime<E>(&self, endpoint: &E, encoder: &BatchEncoder) -> bool
    where
        E: MessagesEndpoint + ?Sized,
    {
        info!("Priming prompt cache");

        let raw = match endpoint.post(&encoder.prime_request()).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cache prime failed: {}", e);
                return false;
            }
        };

        if !raw.is_success() {
            warn!(status = raw.status, "Cache prime failed with status {}", raw.status);
            return false;
        }

        let body: Value = match serde_json::from_str(&raw.body) {
            Ok(body) => body,
            Err(e) => {
                warn!("Cache prime returned an unreadable body: {}", e);
                return false;
            }
        };

        let usage: Usage = body
            .get("usage")
            .cloned()
            .and_then(|usage| serde_json::from_value(usage).ok())
            .unwrap_or_default();

        info!(
            cache_creation_tokens = usage.cache_creation_input_tokens,
            "Prime complete. Tokens cached: {}",
            usage.cache_creation_input_tokens
        );
        self.mark_primed_at(Instant::now());
        true
    }

    /// Prime only when stale
    pub async fn ensure_fresh<E>(&self, endpoint: &E, encoder: &BatchEncoder) -> bool
    where
        E: MessagesEndpoint + ?Sized,
    {
        match self.age() {
            Some(age) if age <= self.ttl => {
                info!(age_secs = age.as_secs(), "Prompt cache is fresh ({}s old)", age.as_secs());
                false
            }
            age => {
                info!(
                    age_secs = age.map(|a| a.as_secs()),
                    "Prompt cache is stale, re-priming"
                );
                self.prime(endpoint, encoder).await
            }
        }
    }
}
