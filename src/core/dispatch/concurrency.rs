//! Concurrency Controller
//!
//! Additive-increase / multiplicative-decrease over the number of batches a
//! wave may carry. The level is shared with in-flight transport calls, which
//! shrink it while backing off, so it lives in an atomic cell.

use crate::config::DispatchConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Bounded AIMD concurrency level
#[derive(Debug)]
pub struct ConcurrencyController {
    current: AtomicUsize,
    min: usize,
    max: usize,
}

impl ConcurrencyController {
    /// `initial` is clamped into `[min, max]`
    pub fn new(initial: usize, min: usize, max: usize) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            current: AtomicUsize::new(initial.clamp(min, max)),
            min,
            max,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(
            config.initial_concurrency,
            config.min_concurrency,
            config.max_concurrency,
        )
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Halve, flooring and clamping to the minimum. Returns the new level.
    pub fn shrink(&self) -> usize {
        let (before, after) = self.update(|level| (level / 2).max(self.min));
        if after != before {
            info!(concurrency = after, "Concurrency reduced to {}", after);
        }
        after
    }

    /// Add one, clamping to the maximum. Returns the new level.
    pub fn grow(&self) -> usize {
        let (before, after) = self.update(|level| (level + 1).min(self.max));
        if after != before {
            info!(concurrency = after, "Concurrency increased to {}", after);
        }
        after
    }

    fn update<F>(&self, f: F) -> (usize, usize)
    where
        F: Fn(usize) -> usize,
    {
        let before = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |level| Some(f(level)))
            .unwrap_or_else(|level| level);
        (before, f(before))
    }
}
