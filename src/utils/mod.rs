//! Utility modules for the dispatch engine
//!
//! - **error**: crate-wide error type and tag taxonomy
//! - **logging**: `tracing` subscriber setup

pub mod error;
pub mod logging;
