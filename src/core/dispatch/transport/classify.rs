//! Response classification
//!
//! Turns a raw status/body pair into either the list of per-item judgments or
//! a tagged error. The envelope schema is closed: any deviation from it fails
//! as `STRUCTURE_ERROR`, a body that is not JSON at all as `PARSE_ERROR`.

use super::endpoint::RawResponse;
use crate::config::EndpointConfig;
use crate::core::messages::{ErrorEnvelope, MessagesResponse, Usage, strip_code_fences};
use crate::utils::error::{DispatchError, Result};
use serde_json::Value;

/// Longest body excerpt carried into an error message
const BODY_EXCERPT_CHARS: usize = 200;

/// Judgments extracted from a successful response
#[derive(Debug, Clone, PartialEq)]
pub struct Judgments {
    pub items: Vec<Value>,
    pub usage: Usage,
}

/// Status and envelope classification
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    endpoint: EndpointConfig,
    results_key: String,
}

impl ResponseClassifier {
    pub fn new(endpoint: &EndpointConfig, results_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.clone(),
            results_key: results_key.into(),
        }
    }

    pub fn classify(&self, raw: &RawResponse) -> Result<Judgments> {
        if !raw.is_success() {
            return Err(self.status_error(raw));
        }

        let value: Value = serde_json::from_str(&raw.body)
            .map_err(|e| DispatchError::parse(format!("Response body is not JSON: {}", e)))?;

        let response: MessagesResponse = serde_json::from_value(value).map_err(|e| {
            DispatchError::structure(format!("Unexpected API response structure: {}", e))
        })?;

        let text = response
            .first_text()
            .ok_or_else(|| DispatchError::structure("Unexpected API response structure."))?;

        let judgment: Value = serde_json::from_str(&strip_code_fences(text))
            .map_err(|e| DispatchError::parse(format!("Judgment text is not JSON: {}", e)))?;

        let items = match judgment {
            Value::Object(mut map) => match map.remove(&self.results_key) {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(DispatchError::structure(format!(
                        "Review data missing \"{}\" array.",
                        self.results_key
                    )));
                }
            },
            _ => {
                return Err(DispatchError::structure(
                    "Judgment is not a JSON object.",
                ));
            }
        };

        Ok(Judgments {
            items,
            usage: response.usage,
        })
    }

    fn status_error(&self, raw: &RawResponse) -> DispatchError {
        let kind = self.endpoint.error_kind_for(raw.status);

        let message = match serde_json::from_str::<ErrorEnvelope>(&raw.body) {
            Ok(envelope) => envelope.error.message,
            Err(_) => format!(
                "API request failed with status {}. Response: {}",
                raw.status,
                raw.body.chars().take(BODY_EXCERPT_CHARS).collect::<String>()
            ),
        };

        DispatchError::upstream(kind, raw.status, message)
    }
}
