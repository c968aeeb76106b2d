//! Configuration management for the dispatch engine
//!
//! This module handles loading, validation, and management of all engine configuration.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Environment variable overriding `endpoint.url`
pub const ENV_ENDPOINT_URL: &str = "BATCH_DISPATCH_ENDPOINT_URL";
/// Environment variable overriding `endpoint.api_key`
pub const ENV_API_KEY: &str = "BATCH_DISPATCH_API_KEY";
/// Environment variable overriding `endpoint.model`
pub const ENV_MODEL: &str = "BATCH_DISPATCH_MODEL";
/// Environment variable overriding `prompt.system_prompt_file`
pub const ENV_SYSTEM_PROMPT_FILE: &str = "BATCH_DISPATCH_SYSTEM_PROMPT_FILE";

/// Main configuration struct for the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Batch sizing, concurrency and retries
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Upstream endpoint
    #[serde(default)]
    pub endpoint: EndpointConfig,
    /// Prompt cache warm-up
    #[serde(default)]
    pub cache: CacheConfig,
    /// Shared instructions and record rendering
    #[serde(default)]
    pub prompt: PromptConfig,
    /// Token prices for cost estimates
    #[serde(default)]
    pub pricing: PricingConfig,
}

impl Config {
    /// Load configuration from a YAML file, apply environment overrides and validate
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DispatchError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML without validating
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overlay values from a variable lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_ENDPOINT_URL) {
            self.endpoint.url = url;
        }
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.endpoint.api_key = Some(api_key);
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.endpoint.model = model;
        }
        if let Some(path) = lookup(ENV_SYSTEM_PROMPT_FILE) {
            self.prompt.system_prompt_file = Some(path.into());
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.dispatch
            .validate()
            .map_err(|e| DispatchError::Config(format!("Dispatch config error: {}", e)))?;

        self.endpoint
            .validate()
            .map_err(|e| DispatchError::Config(format!("Endpoint config error: {}", e)))?;

        self.cache
            .validate()
            .map_err(|e| DispatchError::Config(format!("Cache config error: {}", e)))?;

        self.prompt
            .validate()
            .map_err(|e| DispatchError::Config(format!("Prompt config error: {}", e)))?;

        self.pricing
            .validate()
            .map_err(|e| DispatchError::Config(format!("Pricing config error: {}", e)))?;

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Resolve the shared instructions, reading the prompt file when no inline prompt is set
    pub async fn system_prompt(&self) -> Result<String> {
        if let Some(prompt) = self.prompt.inline_prompt() {
            return Ok(prompt.to_string());
        }

        let path = self.prompt.system_prompt_file.as_ref().ok_or_else(|| {
            DispatchError::Config("No system prompt or system prompt file configured".to_string())
        })?;

        let prompt = tokio::fs::read_to_string(path).await.map_err(|e| {
            DispatchError::Config(format!("Failed to read system prompt {:?}: {}", path, e))
        })?;

        if prompt.trim().is_empty() {
            return Err(DispatchError::Config(format!(
                "System prompt file {:?} is empty",
                path
            )));
        }

        Ok(prompt)
    }
}
