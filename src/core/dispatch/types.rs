//! Dispatch data model
//!
//! Work items, batches, per-batch outcomes and the final run report.

use crate::config::PricingConfig;
use crate::core::messages::Usage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// One input record, as produced by file ingestion
pub type Record = Map<String, Value>;

/// Key under which results carry their item id
pub const ID_FIELD: &str = "unique_id";

/// One unit of input, alive until it reaches a terminal state
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    /// Run-unique identifier
    pub id: String,
    /// Record data, shared with in-flight batch snapshots
    pub payload: Arc<Record>,
    /// Index into the original input sequence
    pub original_position: usize,
    /// Attempts that did not satisfy this item; only ever increases
    pub retry_count: u32,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, payload: Record, original_position: usize) -> Self {
        Self {
            id: id.into(),
            payload: Arc::new(payload),
            original_position,
            retry_count: 0,
        }
    }
}

/// Items sent together in one request
#[derive(Debug, Clone)]
pub struct Batch {
    /// 1-based sequence number within the run, for logs
    pub number: usize,
    /// Read-only snapshots of the queued items
    pub items: Vec<WorkItem>,
}

/// One endpoint judgment, correlated back to its input position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    #[serde(rename = "unique_id")]
    pub id: String,
    pub original_position: usize,
    /// Everything else the endpoint returned for this item
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// An item that will not produce a result in this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    #[serde(rename = "unique_id")]
    pub id: String,
    pub original_position: usize,
    /// Attempts made before giving up
    pub attempts: u32,
    /// Why the last attempt did not satisfy the item
    pub reason: String,
    pub payload: Record,
}

impl FailedItem {
    pub(crate) fn from_item(item: &WorkItem, reason: impl Into<String>) -> Self {
        Self {
            id: item.id.clone(),
            original_position: item.original_position,
            attempts: item.retry_count,
            reason: reason.into(),
            payload: item.payload.as_ref().clone(),
        }
    }

    /// Manual-review placeholder standing in for the missing judgment
    pub fn placeholder(&self) -> ItemResult {
        let mut fields = Map::new();
        fields.insert("confidence".to_string(), json!(1.0));
        fields.insert("needs_review".to_string(), json!(true));
        fields.insert("reason".to_string(), json!("api_failure"));
        fields.insert(
            "justification".to_string(),
            json!(format!(
                "Failed to receive a result after {} attempts ({}). Requires manual inspection.",
                self.attempts, self.reason
            )),
        );

        ItemResult {
            id: self.id.clone(),
            original_position: self.original_position,
            fields,
        }
    }
}

/// Reconciled result of one successful batch call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Requested, first-seen results
    pub valid_results: Vec<ItemResult>,
    /// Ids sent in the request, in batch order
    pub requested_ids: Vec<String>,
    /// Ids matched once, in response order
    pub received_ids: Vec<String>,
    /// Requested ids with no valid result
    pub missing_ids: Vec<String>,
    /// Returned ids that were never requested
    pub invalid_ids: Vec<String>,
    /// Requested ids returned more than once
    pub duplicate_ids: Vec<String>,
    /// Token accounting for this call
    pub usage: Usage,
}

impl BatchOutcome {
    /// Every requested id came back exactly once
    pub fn is_complete(&self) -> bool {
        self.missing_ids.is_empty()
    }
}

/// Token and cache totals over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_input_tokens: u64,
    pub cache_read_input_tokens: u64,
}

impl UsageStats {
    pub fn record(&mut self, usage: &Usage) {
        self.requests += 1;
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.cache_creation_input_tokens += usage.cache_creation_input_tokens;
        self.cache_read_input_tokens += usage.cache_read_input_tokens;
    }

    /// Tokens served from the prompt cache
    pub fn cache_hits(&self) -> u64 {
        self.cache_read_input_tokens
    }

    /// Tokens written to the prompt cache
    pub fn cache_misses(&self) -> u64 {
        self.cache_creation_input_tokens
    }

    /// Estimated spend in dollars
    pub fn estimated_cost(&self, pricing: &PricingConfig) -> f64 {
        let per_token = |tokens: u64, per_mtok: f64| tokens as f64 * per_mtok / 1_000_000.0;

        per_token(self.input_tokens, pricing.input_per_mtok)
            + per_token(self.cache_creation_input_tokens, pricing.cache_write_per_mtok)
            + per_token(self.cache_read_input_tokens, pricing.cache_read_per_mtok)
            + per_token(self.output_tokens, pricing.output_per_mtok)
    }
}

/// Final result of one `process_all` run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Completed results, in completion order
    pub results: Vec<ItemResult>,
    /// Items that exhausted their retry budget
    pub permanently_failed: Vec<FailedItem>,
    /// Items still queued when the run was cancelled
    pub pending: Vec<FailedItem>,
    pub total_count: usize,
    pub usage: UsageStats,
    pub batches_sent: usize,
    pub waves: usize,
    pub final_concurrency: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Results plus manual-review placeholders, ordered by input position
    pub fn with_placeholders(&self) -> Vec<ItemResult> {
        let mut all: Vec<ItemResult> = self
            .results
            .iter()
            .cloned()
            .chain(self.permanently_failed.iter().map(FailedItem::placeholder))
            .collect();
        all.sort_by_key(|result| result.original_position);
        all
    }

    /// Every input item is accounted for exactly once
    pub fn is_conserved(&self) -> bool {
        self.results.len() + self.permanently_failed.len() + self.pending.len()
            == self.total_count
    }

    /// Items that reached a terminal state
    pub fn settled_count(&self) -> usize {
        self.results.len() + self.permanently_failed.len()
    }
}
