//! Test fixtures and data factories
//!
//! Provides factory methods for creating test data with sensible defaults.

use llm_batch_dispatch::Record;
use llm_batch_dispatch::config::Config;
use serde_json::json;

/// Factory for spreadsheet-like input records
pub struct RecordFactory;

impl RecordFactory {
    /// A single session-note row
    pub fn note(index: usize) -> Record {
        let mut record = Record::new();
        record.insert("Date".to_string(), json!(format!("2025-01-{:02}", index % 28 + 1)));
        record.insert("Student Name".to_string(), json!(format!("Student {}", index)));
        record.insert("Internal Notes".to_string(), json!(format!("Session {} went fine", index)));
        record
    }

    /// `count` distinct rows
    pub fn notes(count: usize) -> Vec<Record> {
        (0..count).map(Self::note).collect()
    }
}

/// Configuration pointing at `base_uri`, with fast retries and no warm-up
pub fn test_config(base_uri: &str) -> Config {
    let mut config = Config::default();
    config.endpoint.url = format!("{}/v1/messages", base_uri);
    config.endpoint.request_timeout_secs = 5;
    config.prompt.system_prompt = Some("Review each session note.".to_string());
    config.prompt.fields = vec![
        "Date".to_string(),
        "Student Name".to_string(),
        "Internal Notes".to_string(),
    ];
    config.cache.enabled = false;
    config.dispatch.retry_base_delay_ms = 1;
    config.dispatch.retry_jitter_ms = 0;
    config
}
