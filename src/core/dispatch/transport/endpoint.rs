//! Endpoint seam
//!
//! The transport only needs "post this body, give me status and text back".
//! Every status code is returned as data; only connection-level failures are
//! errors, so classification stays in one place.

use crate::config::EndpointConfig;
use crate::core::messages::MessagesRequest;
use crate::utils::error::{DispatchError, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Status and body of one upstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single-flight text-generation endpoint
#[async_trait]
pub trait MessagesEndpoint: Send + Sync {
    async fn post(&self, request: &MessagesRequest) -> Result<RawResponse>;
}

/// `reqwest`-backed endpoint
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    url: String,
    http_client: Client,
}

impl HttpEndpoint {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let http_client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .default_headers(Self::build_headers(config)?)
            .build()
            .map_err(|e| DispatchError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            http_client,
        })
    }

    fn build_headers(config: &EndpointConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("llm-batch-dispatch/", env!("CARGO_PKG_VERSION"))),
        );

        // Only sent when talking to the vendor directly
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(api_key)
                .map_err(|_| DispatchError::config("API key is not a valid header value"))?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static("x-api-key"), value);
        }

        if let Some(api_version) = &config.api_version {
            let value = HeaderValue::from_str(api_version)
                .map_err(|_| DispatchError::config("API version is not a valid header value"))?;
            headers.insert(HeaderName::from_static("anthropic-version"), value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl MessagesEndpoint for HttpEndpoint {
    async fn post(&self, request: &MessagesRequest) -> Result<RawResponse> {
        let response = self
            .http_client
            .post(&self.url)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}
