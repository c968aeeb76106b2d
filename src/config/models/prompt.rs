//! Prompt configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Shared instructions and record rendering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptConfig {
    /// Instructions sent as the cached system block
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// File to read the instructions from when `system_prompt` is unset
    #[serde(default)]
    pub system_prompt_file: Option<PathBuf>,
    /// Record fields to render, in order; empty renders every field
    #[serde(default)]
    pub fields: Vec<String>,
    /// Key of the per-item results array in the judgment JSON
    #[serde(default = "default_results_key")]
    pub results_key: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            system_prompt_file: None,
            fields: Vec::new(),
            results_key: default_results_key(),
        }
    }
}

impl PromptConfig {
    /// Inline instructions, if any
    pub fn inline_prompt(&self) -> Option<&str> {
        self.system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
    }
}
