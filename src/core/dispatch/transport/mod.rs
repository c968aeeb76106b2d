//! Batch Transport
//!
//! One request per batch, retried with exponential backoff while the failure
//! is transient. The retry loop is an explicit attempt counter so that the
//! backoff sleep is the only suspension point besides the request itself.

mod backoff;
mod classify;
mod endpoint;

pub use backoff::BackoffPolicy;
pub use classify::{Judgments, ResponseClassifier};
pub use endpoint::{HttpEndpoint, MessagesEndpoint, RawResponse};

use super::concurrency::ConcurrencyController;
use super::encoder::BatchEncoder;
use super::reconciler::reconcile;
use super::types::{Batch, BatchOutcome};
use crate::utils::error::{DispatchError, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Sends batches and reconciles their responses
pub struct BatchTransport<E: MessagesEndpoint> {
    endpoint: Arc<E>,
    encoder: Arc<BatchEncoder>,
    classifier: ResponseClassifier,
    backoff: BackoffPolicy,
    concurrency: Arc<ConcurrencyController>,
}

impl<E: MessagesEndpoint> Clone for BatchTransport<E> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            encoder: self.encoder.clone(),
            classifier: self.classifier.clone(),
            backoff: self.backoff,
            concurrency: self.concurrency.clone(),
        }
    }
}

impl<E: MessagesEndpoint> BatchTransport<E> {
    pub fn new(
        endpoint: Arc<E>,
        encoder: Arc<BatchEncoder>,
        classifier: ResponseClassifier,
        backoff: BackoffPolicy,
        concurrency: Arc<ConcurrencyController>,
    ) -> Self {
        Self {
            endpoint,
            encoder,
            classifier,
            backoff,
            concurrency,
        }
    }

    /// Send one batch, retrying transient failures.
    ///
    /// Returns the reconciled outcome, or the last error once the retry budget
    /// is spent or the failure is not retryable. Cancellation interrupts the
    /// backoff sleep, never an in-flight request.
    pub async fn send(&self, batch: &Batch, cancel: &CancellationToken) -> Result<BatchOutcome> {
        let request = self.encoder.encode(&batch.items);
        let mut attempt: u32 = 0;

        loop {
            let result = match self.endpoint.post(&request).await {
                Ok(raw) => self.classifier.classify(&raw),
                Err(e) => Err(e),
            };

            let err = match result {
                Ok(judgments) => {
                    let outcome = reconcile(
                        batch.number,
                        &batch.items,
                        judgments.items,
                        judgments.usage,
                    );
                    info!(
                        batch = batch.number,
                        received = outcome.received_ids.len(),
                        requested = outcome.requested_ids.len(),
                        "Batch {}: received {}/{} results",
                        batch.number,
                        outcome.received_ids.len(),
                        outcome.requested_ids.len()
                    );
                    debug!(
                        batch = batch.number,
                        cache_hits = outcome.usage.cache_read_input_tokens,
                        cache_misses = outcome.usage.cache_creation_input_tokens,
                        "Batch {} cache usage",
                        batch.number
                    );
                    return Ok(outcome);
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                if err.kind().is_client_error() {
                    error!(
                        batch = batch.number,
                        kind = %err.kind(),
                        "Batch {} rejected by endpoint, not retrying: {}",
                        batch.number,
                        err
                    );
                } else {
                    warn!(
                        batch = batch.number,
                        kind = %err.kind(),
                        "Batch {} failed, not retrying: {}",
                        batch.number,
                        err
                    );
                }
                return Err(err);
            }

            if !self.backoff.can_retry(attempt) {
                error!(
                    batch = batch.number,
                    attempts = attempt + 1,
                    "Batch {}: maximum retries reached: {}",
                    batch.number,
                    err
                );
                return Err(err);
            }

            let delay = self.backoff.delay_for(attempt, &mut rand::thread_rng());
            let level = self.concurrency.shrink();
            warn!(
                batch = batch.number,
                attempt = attempt + 1,
                concurrency = level,
                "Batch {}: {}. Retrying in {}ms",
                batch.number,
                err,
                delay.as_millis()
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(DispatchError::cancelled(format!(
                        "Batch {} cancelled during backoff",
                        batch.number
                    )));
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
