//! Core functionality for the dispatch engine
//!
//! The upstream envelope schema and the dispatch machinery built on top of it.

pub mod dispatch;
pub mod messages;
