//! Messages response envelope
//!
//! The schema is deliberately closed: anything that does not deserialize into
//! [`MessagesResponse`] is a structure error rather than something to probe.

use serde::{Deserialize, Serialize};

/// Token accounting reported with every response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Successful response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Usage,
}

impl MessagesResponse {
    /// Text of the first content block, when it has non-empty text
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .first()
            .and_then(|block| block.text.as_deref())
            .filter(|text| !text.is_empty())
    }
}

/// Error body returned with non-success statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    pub message: String,
}

/// Remove markdown code fences around a JSON payload and trim it
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json\n", "")
        .replace("```json", "")
        .replace("```\n", "")
        .replace("```", "")
        .trim()
        .to_string()
}
