//! Response Reconciler
//!
//! Matches the endpoint's judgments back to the ids a batch asked for.
//! Invariant: `valid_results.len() + missing_ids.len() == requested_ids.len()`
//! and no id appears twice among the valid results.

use super::types::{BatchOutcome, ID_FIELD, ItemResult, WorkItem};
use crate::core::messages::Usage;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Key the reconciler stamps on results; stripped from endpoint output
const POSITION_FIELD: &str = "original_position";

/// Partition raw judgments into valid, invalid, duplicate and missing
pub fn reconcile(
    batch_number: usize,
    items: &[WorkItem],
    judgments: Vec<Value>,
    usage: Usage,
) -> BatchOutcome {
    let positions: HashMap<&str, usize> = items
        .iter()
        .map(|item| (item.id.as_str(), item.original_position))
        .collect();

    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut outcome = BatchOutcome {
        requested_ids: items.iter().map(|item| item.id.clone()).collect(),
        usage,
        ..Default::default()
    };

    for judgment in judgments {
        let Value::Object(mut fields) = judgment else {
            outcome.invalid_ids.push(String::new());
            continue;
        };

        // Ids are compared as strings only; `12345` never matches "12345"
        let id = match fields.remove(ID_FIELD) {
            Some(Value::String(id)) => id,
            Some(other) => {
                outcome.invalid_ids.push(other.to_string());
                continue;
            }
            None => {
                outcome.invalid_ids.push(String::new());
                continue;
            }
        };

        let Some(&original_position) = positions.get(id.as_str()) else {
            outcome.invalid_ids.push(id);
            continue;
        };

        if !seen.insert(id.clone()) {
            outcome.duplicate_ids.push(id);
            continue;
        }

        fields.remove(POSITION_FIELD);
        outcome.received_ids.push(id.clone());
        outcome.valid_results.push(ItemResult {
            id,
            original_position,
            fields,
        });
    }

    outcome.missing_ids = outcome
        .requested_ids
        .iter()
        .filter(|id| !seen.contains(id.as_str()))
        .cloned()
        .collect();

    if !outcome.invalid_ids.is_empty() {
        warn!(
            batch = batch_number,
            ids = %outcome.invalid_ids.join(","),
            "Batch {} returned {} unrequested ids",
            batch_number,
            outcome.invalid_ids.len()
        );
    }
    if !outcome.duplicate_ids.is_empty() {
        warn!(
            batch = batch_number,
            ids = %outcome.duplicate_ids.join(","),
            "Batch {} returned {} duplicate ids",
            batch_number,
            outcome.duplicate_ids.len()
        );
    }
    if !outcome.missing_ids.is_empty() {
        warn!(
            batch = batch_number,
            ids = %outcome.missing_ids.join(","),
            "Batch {} missing {} ids",
            batch_number,
            outcome.missing_ids.len()
        );
    }

    outcome
}
