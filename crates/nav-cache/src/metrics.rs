//! Per-cache statistics
//!
//! `MetricsRecorder` lives inside the cache's critical section, so every
//! counter update is applied together with the entry mutation it
//! describes. `CacheMetrics` is the immutable snapshot handed to callers.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Fraction of lookups that were hits; exactly `0.0` when there were none
#[inline]
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Snapshot of one cache's statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    /// Lookups that found a live entry
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0
    pub hit_rate: f64,
    /// Mean duration of the recorded operation window, in milliseconds
    pub avg_response_time_ms: f64,
    /// Approximate bytes held by stored keys and values
    pub memory_usage_bytes: u64,
    /// Number of stored entries
    pub keys: u64,
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self {
            hits: 0,
            misses: 0,
            hit_rate: 0.0,
            avg_response_time_ms: 0.0,
            memory_usage_bytes: 0,
            keys: 0,
        }
    }
}

/// Mutable counters owned by a cache
#[derive(Debug)]
pub(crate) struct MetricsRecorder {
    hits: u64,
    misses: u64,
    samples: VecDeque<Duration>,
    window: usize,
    sample_total: Duration,
    memory_bytes: u64,
}

impl MetricsRecorder {
    pub(crate) fn new(window: usize) -> Self {
        Self {
            hits: 0,
            misses: 0,
            samples: VecDeque::with_capacity(window.min(1024)),
            window: window.max(1),
            sample_total: Duration::ZERO,
            memory_bytes: 0,
        }
    }

    #[inline]
    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    #[inline]
    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_duration(&mut self, elapsed: Duration) {
        if self.samples.len() == self.window {
            if let Some(oldest) = self.samples.pop_front() {
                self.sample_total = self.sample_total.saturating_sub(oldest);
            }
        }
        self.samples.push_back(elapsed);
        self.sample_total += elapsed;
    }

    #[inline]
    pub(crate) fn add_memory(&mut self, bytes: u64) {
        self.memory_bytes = self.memory_bytes.saturating_add(bytes);
    }

    #[inline]
    pub(crate) fn remove_memory(&mut self, bytes: u64) {
        self.memory_bytes = self.memory_bytes.saturating_sub(bytes);
    }

    #[inline]
    pub(crate) fn clear_memory(&mut self) {
        self.memory_bytes = 0;
    }

    /// Zero every counter and drop the sample window
    pub(crate) fn reset(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.samples.clear();
        self.sample_total = Duration::ZERO;
    }

    #[allow(clippy::cast_precision_loss)]
    fn avg_response_time_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.sample_total.as_secs_f64() * 1000.0 / self.samples.len() as f64
    }

    pub(crate) fn snapshot(&self, keys: usize) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits,
            misses: self.misses,
            hit_rate: hit_rate(self.hits, self.misses),
            avg_response_time_ms: self.avg_response_time_ms(),
            memory_usage_bytes: self.memory_bytes,
            keys: keys as u64,
        }
    }
}
