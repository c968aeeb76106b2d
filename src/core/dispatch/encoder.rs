//! Batch Encoder
//!
//! Renders identified records into the request body. Each record becomes a
//! block headed by its id so the endpoint can key its judgments by id.

use super::types::{ID_FIELD, Record, WorkItem};
use crate::config::{EndpointConfig, PromptConfig};
use crate::core::messages::{Message, MessagesRequest, SystemBlock};
use serde_json::Value;
use std::sync::Arc;

const PRIME_MESSAGE: &str = "Cache priming request - please respond with OK";

/// Serializes batches into upstream requests
#[derive(Debug, Clone)]
pub struct BatchEncoder {
    model: String,
    max_tokens: u32,
    prime_max_tokens: u32,
    system_prompt: Arc<str>,
    fields: Vec<String>,
    results_key: String,
}

impl BatchEncoder {
    pub fn new(
        endpoint: &EndpointConfig,
        prompt: &PromptConfig,
        system_prompt: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            model: endpoint.model.clone(),
            max_tokens: endpoint.max_tokens,
            prime_max_tokens: endpoint.prime_max_tokens,
            system_prompt: system_prompt.into(),
            fields: prompt.fields.clone(),
            results_key: prompt.results_key.clone(),
        }
    }

    /// Key of the results array the endpoint is told to return
    pub fn results_key(&self) -> &str {
        &self.results_key
    }

    /// Request for one batch
    pub fn encode(&self, items: &[WorkItem]) -> MessagesRequest {
        let content = format!(
            "Analyze these records:\n\n<records>\n{}\n</records>\n\n\
             Respond with a single JSON object containing a \"{}\" array with exactly one \
             entry per record above. Every entry must include the record's \"{}\" value \
             exactly as given in its header.",
            self.render_records(items),
            self.results_key,
            ID_FIELD
        );

        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            stream: false,
            system: vec![SystemBlock::cached_text(self.system_prompt.as_ref())],
            messages: vec![Message::user(content)],
        }
    }

    /// Minimal request that only loads the shared instructions into the cache
    pub fn prime_request(&self) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.prime_max_tokens,
            stream: false,
            system: vec![SystemBlock::cached_text(self.system_prompt.as_ref())],
            messages: vec![Message::user(PRIME_MESSAGE)],
        }
    }

    /// One `--- Row ID: <id> ---` block per item, separated by blank lines
    pub fn render_records(&self, items: &[WorkItem]) -> String {
        items
            .iter()
            .map(|item| {
                format!(
                    "--- Row ID: {} ---\n{}",
                    item.id,
                    self.render_fields(&item.payload)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn render_fields(&self, record: &Record) -> String {
        if self.fields.is_empty() {
            record
                .iter()
                .map(|(name, value)| format!("{}: {}", name, render_value(Some(value))))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            self.fields
                .iter()
                .map(|name| format!("{}: {}", name, render_value(record.get(name))))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
