//! Dispatch Loop
//!
//! Drives waves of concurrent batches until every item is either completed
//! or permanently failed. All item bookkeeping happens on the orchestrating
//! task at the wave barrier; batch calls only ever see read-only snapshots.

use super::concurrency::ConcurrencyController;
use super::encoder::BatchEncoder;
use super::identity::IdentityAssigner;
use super::transport::{
    BackoffPolicy, BatchTransport, HttpEndpoint, MessagesEndpoint, ResponseClassifier,
};
use super::types::{
    Batch, BatchOutcome, FailedItem, ItemResult, Record, RunReport, UsageStats, WorkItem,
};
use super::warmup::PromptCache;
use crate::config::{Config, ShrinkPolicy};
use crate::utils::error::{DispatchError, ErrorKind, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Progress callback, invoked after every wave with `(settled, total)`
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Batch dispatch engine
pub struct Dispatcher<E: MessagesEndpoint> {
    config: Config,
    endpoint: Arc<E>,
    encoder: Arc<BatchEncoder>,
    prompt_cache: PromptCache,
    identity: IdentityAssigner,
}

impl Dispatcher<HttpEndpoint> {
    /// Dispatcher talking HTTP to the configured endpoint
    pub async fn from_config(config: Config) -> Result<Self> {
        let endpoint = Arc::new(HttpEndpoint::new(&config.endpoint)?);
        Self::new(config, endpoint).await
    }
}

impl<E: MessagesEndpoint> Dispatcher<E> {
    /// Resolves the system prompt (inline or from file) and builds the dispatcher
    pub async fn new(config: Config, endpoint: Arc<E>) -> Result<Self> {
        let system_prompt = config.system_prompt().await?;
        Ok(Self::with_system_prompt(config, endpoint, system_prompt))
    }

    pub fn with_system_prompt(
        config: Config,
        endpoint: Arc<E>,
        system_prompt: impl Into<Arc<str>>,
    ) -> Self {
        let encoder = Arc::new(BatchEncoder::new(
            &config.endpoint,
            &config.prompt,
            system_prompt,
        ));
        let prompt_cache = PromptCache::from_config(&config.cache);

        Self {
            config,
            endpoint,
            encoder,
            prompt_cache,
            identity: IdentityAssigner::default(),
        }
    }

    /// Replace the identifier scheme
    pub fn with_identity(mut self, identity: IdentityAssigner) -> Self {
        self.identity = identity;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn prompt_cache(&self) -> &PromptCache {
        &self.prompt_cache
    }

    /// Process every record to completion
    pub async fn process_all(
        &self,
        records: Vec<Record>,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<RunReport> {
        self.process_all_with_cancel(records, on_progress, CancellationToken::new())
            .await
    }

    /// Process every record, stopping before the next wave once `cancel` fires.
    ///
    /// Only `CAPACITY_EXCEEDED` aborts the run; batch failures are absorbed
    /// into the per-item retry budget.
    pub async fn process_all_with_cancel(
        &self,
        records: Vec<Record>,
        on_progress: Option<ProgressFn<'_>>,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let total_count = records.len();
        let dispatch = &self.config.dispatch;
        info!(records = total_count, "Starting dispatch of {} records", total_count);

        let items = self.identity.assign(records)?;

        if self.config.cache.enabled && total_count > 0 {
            self.prompt_cache
                .ensure_fresh(self.endpoint.as_ref(), &self.encoder)
                .await;
        }

        let concurrency = Arc::new(ConcurrencyController::from_config(dispatch));
        let transport = BatchTransport::new(
            self.endpoint.clone(),
            self.encoder.clone(),
            ResponseClassifier::new(&self.config.endpoint, self.encoder.results_key()),
            BackoffPolicy::from_config(dispatch),
            concurrency.clone(),
        );

        let mut run = RunState::new(items, dispatch.max_retries);
        let mut cancelled = false;
        let mut waves = 0;

        while !run.queue.is_empty() {
            if cancel.is_cancelled() {
                warn!(pending = run.queue.len(), "Dispatch cancelled");
                cancelled = true;
                break;
            }

            waves += 1;
            let batches = run.carve(concurrency.current(), dispatch.batch_size);
            debug!(
                wave = waves,
                batches = batches.len(),
                queued = run.queue.len(),
                "Wave {}: launching {} batches",
                waves,
                batches.len()
            );

            let settled =
                join_all(batches.iter().map(|batch| transport.send(batch, &cancel))).await;

            let mut clean = true;
            let mut rejected = 0;
            for (batch, result) in batches.iter().zip(settled) {
                match result {
                    Ok(outcome) => {
                        if !run.fold_outcome(outcome) {
                            clean = false;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Cancelled => {
                        run.restore(batch);
                        clean = false;
                    }
                    Err(e) => {
                        error!(batch = batch.number, "Batch {} failed: {}", batch.number, e);
                        run.reject(batch, &e);
                        rejected += 1;
                        clean = false;
                    }
                }
            }

            match dispatch.shrink_policy {
                ShrinkPolicy::PerWave if rejected > 0 => {
                    concurrency.shrink();
                }
                ShrinkPolicy::PerWave => {}
                ShrinkPolicy::PerBatch => {
                    for _ in 0..rejected {
                        concurrency.shrink();
                    }
                }
            }
            if clean {
                concurrency.grow();
            }

            if let Some(on_progress) = on_progress {
                on_progress(run.settled(), total_count);
            }
        }

        let report = run.into_report(RunSummary {
            total_count,
            waves,
            final_concurrency: concurrency.current(),
            cancelled,
            started_at,
        });

        info!(
            results = report.results.len(),
            failed = report.permanently_failed.len(),
            pending = report.pending.len(),
            "Processing complete: {} results, {} failed",
            report.results.len(),
            report.permanently_failed.len()
        );
        info!(
            cache_hits = report.usage.cache_hits(),
            cache_misses = report.usage.cache_misses(),
            "Session cache totals: hits {}, misses {}",
            report.usage.cache_hits(),
            report.usage.cache_misses()
        );

        Ok(report)
    }
}

/// Run-level figures that are not part of the item bookkeeping
struct RunSummary {
    total_count: usize,
    waves: usize,
    final_concurrency: usize,
    cancelled: bool,
    started_at: DateTime<Utc>,
}

/// Item bookkeeping owned by the orchestrating task
struct RunState {
    /// Ids waiting to be carved into a batch, head first
    queue: VecDeque<String>,
    /// Every item that has not reached a terminal state
    live: HashMap<String, WorkItem>,
    results: Vec<ItemResult>,
    failed: Vec<FailedItem>,
    usage: UsageStats,
    max_retries: u32,
    batches_sent: usize,
}

impl RunState {
    fn new(items: Vec<WorkItem>, max_retries: u32) -> Self {
        let queue = items.iter().map(|item| item.id.clone()).collect();
        let live = items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();

        Self {
            queue,
            live,
            results: Vec::new(),
            failed: Vec::new(),
            usage: UsageStats::default(),
            max_retries,
            batches_sent: 0,
        }
    }

    fn settled(&self) -> usize {
        self.results.len() + self.failed.len()
    }

    /// Up to `level` batches of at most `batch_size` items from the queue head
    fn carve(&mut self, level: usize, batch_size: usize) -> Vec<Batch> {
        let batch_size = batch_size.max(1);
        let mut batches = Vec::with_capacity(level.min(self.queue.len().div_ceil(batch_size)));

        while batches.len() < level.max(1) && !self.queue.is_empty() {
            let take = batch_size.min(self.queue.len());
            let items = self
                .queue
                .drain(..take)
                .filter_map(|id| self.live.get(&id).cloned())
                .collect::<Vec<_>>();

            if items.is_empty() {
                continue;
            }

            self.batches_sent += 1;
            batches.push(Batch {
                number: self.batches_sent,
                items,
            });
        }

        batches
    }

    /// Fold a reconciled outcome. Returns whether the batch was complete.
    fn fold_outcome(&mut self, outcome: BatchOutcome) -> bool {
        self.usage.record(&outcome.usage);

        for result in outcome.valid_results {
            if self.live.remove(&result.id).is_some() {
                self.results.push(result);
            }
        }

        for id in &outcome.missing_ids {
            self.retry_or_fail(id, "missing from response");
        }

        outcome.missing_ids.is_empty()
    }

    /// Count a failed attempt against every item of the batch
    fn reject(&mut self, batch: &Batch, err: &DispatchError) {
        let reason = err.to_string();
        for item in &batch.items {
            self.retry_or_fail(&item.id, &reason);
        }
    }

    /// Put a cancelled batch back without touching retry counts
    fn restore(&mut self, batch: &Batch) {
        for item in &batch.items {
            if self.live.contains_key(&item.id) {
                self.queue.push_back(item.id.clone());
            }
        }
    }

    fn retry_or_fail(&mut self, id: &str, reason: &str) {
        let Some(item) = self.live.get_mut(id) else {
            return;
        };

        item.retry_count = item.retry_count.saturating_add(1);
        if item.retry_count <= self.max_retries {
            let attempt = item.retry_count.saturating_add(1);
            debug!(
                id,
                attempt,
                "Re-queuing {} (attempt {}/{})",
                id,
                attempt,
                self.max_retries.saturating_add(1)
            );
            self.queue.push_back(id.to_string());
        } else if let Some(item) = self.live.remove(id) {
            error!(
                id,
                position = item.original_position,
                "Item {} exceeded max retries: {}",
                id,
                reason
            );
            self.failed.push(FailedItem::from_item(&item, reason));
        }
    }

    fn into_report(mut self, summary: RunSummary) -> RunReport {
        let pending = self
            .queue
            .drain(..)
            .filter_map(|id| self.live.remove(&id))
            .map(|item| FailedItem::from_item(&item, "cancelled"))
            .collect();

        RunReport {
            results: self.results,
            permanently_failed: self.failed,
            pending,
            total_count: summary.total_count,
            usage: self.usage,
            batches_sent: self.batches_sent,
            waves: summary.waves,
            final_concurrency: summary.final_concurrency,
            cancelled: summary.cancelled,
            started_at: summary.started_at,
            finished_at: Utc::now(),
        }
    }
}
