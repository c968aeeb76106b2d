//! Upstream endpoint configuration

use super::*;
use crate::utils::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where batches are sent and how transport statuses are tagged
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointConfig {
    /// Messages endpoint (the credential-forwarding proxy, or the vendor directly)
    #[serde(default = "default_endpoint_url")]
    pub url: String,
    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,
    /// API key, only needed when talking to the vendor without the proxy
    #[serde(default)]
    pub api_key: Option<String>,
    /// API version header, sent only when set
    #[serde(default)]
    pub api_version: Option<String>,
    /// Output token budget for batch requests
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Output token budget for the warm-up request
    #[serde(default = "default_prime_max_tokens")]
    pub prime_max_tokens: u32,
    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Status code to error tag
    #[serde(default = "default_error_kinds")]
    pub error_kinds: HashMap<u16, ErrorKind>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint_url(),
            model: default_model(),
            api_key: None,
            api_version: None,
            max_tokens: default_max_tokens(),
            prime_max_tokens: default_prime_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            error_kinds: default_error_kinds(),
        }
    }
}

impl EndpointConfig {
    /// Tag for a non-success status; unmapped statuses become `HTTP_ERROR`
    pub fn error_kind_for(&self, status: u16) -> ErrorKind {
        self.error_kinds
            .get(&status)
            .copied()
            .unwrap_or(ErrorKind::HttpError)
    }
}

/// Default status mapping
pub fn default_error_kinds() -> HashMap<u16, ErrorKind> {
    HashMap::from([
        (400, ErrorKind::InvalidRequest),
        (403, ErrorKind::Permission),
        (404, ErrorKind::NotFound),
        (413, ErrorKind::TooLarge),
        (429, ErrorKind::RateLimit),
        (500, ErrorKind::ServerError),
        (529, ErrorKind::Overloaded),
    ])
}
