//! Adaptive batch dispatch
//!
//! Groups records into bounded batches, sends them to the messages endpoint
//! under an AIMD concurrency limit, and reconciles every response against the
//! ids it asked for until each record is completed or permanently failed.

mod concurrency;
mod dispatcher;
mod encoder;
mod identity;
mod reconciler;
pub mod transport;
mod types;
mod warmup;

pub use concurrency::ConcurrencyController;
pub use dispatcher::{Dispatcher, ProgressFn};
pub use encoder::BatchEncoder;
pub use identity::{
    DEFAULT_ALPHABET, DEFAULT_ID_LENGTH, DEFAULT_MAX_ATTEMPTS, IdentityAssigner,
};
pub use reconciler::reconcile;
pub use transport::{
    BackoffPolicy, BatchTransport, HttpEndpoint, MessagesEndpoint, RawResponse,
    ResponseClassifier,
};
pub use types::{
    Batch, BatchOutcome, FailedItem, ID_FIELD, ItemResult, Record, RunReport, UsageStats,
    WorkItem,
};
pub use warmup::PromptCache;
