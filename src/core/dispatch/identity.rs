//! Identity Assigner
//!
//! Stamps every input record with a short run-unique identifier before any
//! network activity starts. Identifiers look like abbreviated git hashes
//! (`0-9a-z`, five characters) and never depend on record content.

use super::types::{Record, WorkItem};
use crate::utils::error::{DispatchError, Result};
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

/// Characters identifiers are drawn from
pub const DEFAULT_ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyz";
/// Identifier length
pub const DEFAULT_ID_LENGTH: usize = 5;
/// Draws allowed per identifier before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Assigns collision-free identifiers to records
#[derive(Debug, Clone)]
pub struct IdentityAssigner {
    alphabet: Vec<char>,
    length: usize,
    max_attempts: u32,
}

impl Default for IdentityAssigner {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.chars().collect(),
            length: DEFAULT_ID_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl IdentityAssigner {
    pub fn new(alphabet: &str, length: usize, max_attempts: u32) -> Result<Self> {
        let alphabet: Vec<char> = alphabet.chars().collect();
        if alphabet.is_empty() || length == 0 || max_attempts == 0 {
            return Err(DispatchError::config(
                "Identifier alphabet, length and attempt cap must all be non-empty",
            ));
        }

        Ok(Self {
            alphabet,
            length,
            max_attempts,
        })
    }

    /// Number of distinct identifiers, saturating at `u128::MAX`
    pub fn id_space(&self) -> u128 {
        let base = self.alphabet.len() as u128;
        (0..self.length).fold(1u128, |acc, _| acc.saturating_mul(base))
    }

    /// Turn records into work items with fresh identifiers
    pub fn assign(&self, records: Vec<Record>) -> Result<Vec<WorkItem>> {
        self.assign_with_rng(records, &mut rand::thread_rng())
    }

    /// Same as [`assign`](Self::assign) with a caller-supplied generator
    pub fn assign_with_rng<R: Rng>(
        &self,
        records: Vec<Record>,
        rng: &mut R,
    ) -> Result<Vec<WorkItem>> {
        if records.len() as u128 > self.id_space() {
            return Err(DispatchError::capacity_exceeded(format!(
                "{} records exceed the identifier space of {}",
                records.len(),
                self.id_space()
            )));
        }

        let mut assigned = HashSet::with_capacity(records.len());
        let items = records
            .into_iter()
            .enumerate()
            .map(|(position, record)| {
                let id = self.fresh_id(&assigned, rng)?;
                assigned.insert(id.clone());
                Ok(WorkItem::new(id, record, position))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(count = items.len(), "assigned identifiers");
        Ok(items)
    }

    fn fresh_id<R: Rng>(&self, taken: &HashSet<String>, rng: &mut R) -> Result<String> {
        for _ in 0..self.max_attempts {
            let id: String = (0..self.length)
                .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())])
                .collect();
            if !taken.contains(&id) {
                return Ok(id);
            }
        }

        Err(DispatchError::capacity_exceeded(format!(
            "No free identifier found after {} attempts ({} of {} taken)",
            self.max_attempts,
            taken.len(),
            self.id_space()
        )))
    }
}
