//! Error handling for the dispatch engine
//!
//! This module defines all error types used throughout the engine.

#![allow(missing_docs)]

mod conversions;
mod helpers;
mod types;

pub use types::{DispatchError, ErrorKind, Result};
