//! Endpoint validators

use super::trait_def::Validate;
use crate::config::models::*;
use url::Url;

impl Validate for EndpointConfig {
    fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.url)
            .map_err(|e| format!("Endpoint URL has invalid format: {}", e))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(format!(
                    "Endpoint URL must use http:// or https:// scheme, got: {}",
                    scheme
                ));
            }
        }

        if url.host_str().is_none() {
            return Err("Endpoint URL must have a valid host".to_string());
        }

        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }

        if self.max_tokens == 0 || self.prime_max_tokens == 0 {
            return Err("Token budgets must be greater than 0".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        if let Some(status) = self.error_kinds.keys().find(|status| **status < 400) {
            return Err(format!(
                "Status {} is not an error status and cannot be mapped to an error kind",
                status
            ));
        }

        Ok(())
    }
}
