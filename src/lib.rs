//! # llm-batch-dispatch
//!
//! Adaptive batch-dispatch engine for single-flight text-generation endpoints.
//!
//! Takes a large collection of independent records, groups them into bounded
//! batches, sends each batch to the endpoint and reconciles the per-record
//! judgments that come back against what was asked for. Retries, backoff and
//! an AIMD concurrency limit keep going until every record is either completed
//! or permanently failed.
//!
//! ## Features
//!
//! - **Id reconciliation**: every record gets a short run-unique id; missing,
//!   duplicated and unrequested ids in a response are detected per batch
//! - **Two-level retries**: transient HTTP failures are retried inside the
//!   transport with exponential backoff and jitter, incomplete batches are
//!   requeued per record within a bounded budget
//! - **AIMD concurrency**: halve on failure, add one after a clean wave
//! - **Prompt cache warm-up**: shared instructions are primed once per TTL
//! - **Usage accounting**: token, cache and cost totals for every run
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use llm_batch_dispatch::{Config, Dispatcher, Record};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/dispatch.yaml").await?;
//!     let dispatcher = Dispatcher::from_config(config).await?;
//!
//!     let records: Vec<Record> = serde_json::from_str(r#"[{"note": "a"}, {"note": "b"}]"#)?;
//!     let progress = |done: usize, total: usize| println!("{}/{}", done, total);
//!     let report = dispatcher.process_all(records, Some(&progress)).await?;
//!
//!     println!(
//!         "{} results, {} need manual review",
//!         report.results.len(),
//!         report.permanently_failed.len()
//!     );
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use utils::error::{DispatchError, ErrorKind, Result};

pub use core::dispatch::{
    Dispatcher, FailedItem, HttpEndpoint, ItemResult, MessagesEndpoint, ProgressFn, RawResponse,
    Record, RunReport, UsageStats,
};
pub use core::messages::{MessagesRequest, MessagesResponse, Usage};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
