//! Error Handling utilities
//!
//! This module provides the error type, the error-kind taxonomy and the
//! retryability rules shared by the transport and the dispatch loop.

pub mod error;

// Re-export commonly used types
pub use error::*;
