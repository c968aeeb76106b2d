//! Configuration validation
//!
//! This module provides validation logic for all configuration structures.
//!
//! - `trait_def`: Core Validate trait definition
//! - `dispatch_validators`: Dispatch, cache, prompt and pricing validators
//! - `endpoint_validators`: Endpoint URL, token budget and status-mapping validators
//! - `tests`: Test suite for all validators

mod dispatch_validators;
mod endpoint_validators;
mod trait_def;

pub use trait_def::Validate;
