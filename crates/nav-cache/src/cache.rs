//! TTL key/value cache with per-operation metrics
//!
//! Every operation runs inside a single critical section that covers both
//! the entry map and the counters, so concurrent `get`/`set` on the same
//! key never lose a hit or miss. Expired entries are evicted lazily when
//! touched, or by an explicit `purge_expired` sweep.

use crate::config::CacheConfig;
use crate::metrics::{CacheMetrics, MetricsRecorder};
use crate::size::estimate_entry_size;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Remaining lifetime of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Entry was stored with a zero TTL and never expires
    Never,
    /// Entry expires after this much more time
    In(Duration),
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
    size_bytes: u64,
}

impl<V> CacheEntry<V> {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

fn deadline(now: Instant, ttl: Duration) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        now.checked_add(ttl)
    }
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    recorder: MetricsRecorder,
    closed: bool,
}

impl<V: Clone> Inner<V> {
    fn evict(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.recorder.remove_memory(entry.size_bytes);
                true
            }
            None => false,
        }
    }

    /// Live entry for `key`, evicting it first if it has expired
    fn live(&mut self, key: &str, now: Instant) -> Option<&mut CacheEntry<V>> {
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.evict(key);
            return None;
        }
        self.entries.get_mut(key)
    }

    fn purge(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.evict(key);
        }
        expired.len()
    }
}

/// Named TTL cache that tracks hits, misses, latency, and memory
pub struct MetricsCache<V> {
    name: String,
    default_ttl: Duration,
    inner: Mutex<Inner<V>>,
}

impl<V> fmt::Debug for MetricsCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsCache")
            .field("name", &self.name)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl<V> MetricsCache<V>
where
    V: Clone + Serialize + Send + Sync,
{
    /// Create an empty cache
    #[must_use]
    pub fn new(name: impl Into<String>, config: &CacheConfig) -> Self {
        Self {
            name: name.into(),
            default_ttl: config.default_ttl(),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recorder: MetricsRecorder::new(config.response_window),
                closed: false,
            }),
        }
    }

    /// Cache name used in logs, metrics labels, and the registry
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store `value` under `key`, replacing any previous entry and TTL.
    ///
    /// A zero `ttl` stores the entry without expiry. Returns `false` for an
    /// empty key, which can never be looked up, and once the cache is closed.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) -> bool {
        let started = std::time::Instant::now();
        let key = key.into();
        if key.is_empty() {
            tracing::warn!(cache = %self.name, "rejected set with empty key");
            return false;
        }

        let size_bytes = estimate_entry_size(&key, &value);
        let mut inner = self.inner.lock();
        if inner.closed {
            drop(inner);
            tracing::debug!(cache = %self.name, "rejected set on closed cache");
            return false;
        }
        let expires_at = deadline(Instant::now(), ttl);
        inner.evict(&key);
        inner.recorder.add_memory(size_bytes);
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                size_bytes,
            },
        );
        let elapsed = started.elapsed();
        inner.recorder.record_duration(elapsed);
        drop(inner);

        self.emit_latency("set", elapsed);
        true
    }

    /// Store `value` with the configured default TTL
    #[inline]
    pub fn set_default(&self, key: impl Into<String>, value: V) -> bool {
        self.set(key, value, self.default_ttl)
    }

    /// Look up a live value.
    ///
    /// Counts exactly one hit or miss. Expired entries are evicted and
    /// counted as misses; an empty key is always a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let started = std::time::Instant::now();
        let mut inner = self.inner.lock();
        let value = if key.is_empty() {
            None
        } else {
            let now = Instant::now();
            inner.live(key, now).map(|entry| entry.value.clone())
        };
        if value.is_some() {
            inner.recorder.record_hit();
        } else {
            inner.recorder.record_miss();
        }
        let elapsed = started.elapsed();
        inner.recorder.record_duration(elapsed);
        drop(inner);

        if value.is_some() {
            metrics::counter!("nav_cache_hits_total", "cache" => self.name.clone()).increment(1);
        } else {
            metrics::counter!("nav_cache_misses_total", "cache" => self.name.clone())
                .increment(1);
        }
        self.emit_latency("get", elapsed);
        value
    }

    /// Remove `key`; returns the number of entries removed (0 or 1)
    pub fn del(&self, key: &str) -> usize {
        let started = std::time::Instant::now();
        let mut inner = self.inner.lock();
        let removed = usize::from(inner.evict(key));
        let elapsed = started.elapsed();
        inner.recorder.record_duration(elapsed);
        drop(inner);

        self.emit_latency("del", elapsed);
        removed
    }

    /// Batch `get`, one hit or miss per key, in input order
    pub fn mget<K: AsRef<str>>(&self, keys: &[K]) -> Vec<Option<V>> {
        keys.iter().map(|key| self.get(key.as_ref())).collect()
    }

    /// Batch `set`; every entry is attempted, returns `false` if any failed
    pub fn mset<K, I>(&self, entries: I) -> bool
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, V, Duration)>,
    {
        let mut all_stored = true;
        for (key, value, ttl) in entries {
            all_stored &= self.set(key, value, ttl);
        }
        all_stored
    }

    /// Live keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        inner.purge(Instant::now());
        let mut keys: Vec<String> = inner.entries.keys().cloned().collect();
        drop(inner);
        keys.sort_unstable();
        keys
    }

    /// Remove every entry. Hit and miss counters are lifetime statistics
    /// and survive the flush.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.recorder.clear_memory();
        drop(inner);
        tracing::debug!(cache = %self.name, removed, "cache cleared");
    }

    /// Drop every entry and refuse further writes. Reads keep working and
    /// keep counting misses.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.recorder.clear_memory();
        inner.closed = true;
        drop(inner);
        tracing::debug!(cache = %self.name, removed, "cache closed");
    }

    /// `close` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Remaining lifetime of a live entry
    pub fn get_ttl(&self, key: &str) -> Option<Expiry> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        inner.live(key, now).map(|entry| match entry.expires_at {
            None => Expiry::Never,
            Some(deadline) => Expiry::In(deadline.saturating_duration_since(now)),
        })
    }

    /// Replace the lifetime of a live entry without touching its value.
    ///
    /// Returns `false` if the key is absent or already expired.
    pub fn set_ttl(&self, key: &str, ttl: Duration) -> bool {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        match inner.live(key, now) {
            Some(entry) => {
                entry.expires_at = deadline(now, ttl);
                true
            }
            None => false,
        }
    }

    /// Evict every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        self.inner.lock().purge(Instant::now())
    }

    /// Statistics snapshot. Expired entries are evicted first so key count
    /// and memory describe the same set of entries.
    #[must_use]
    pub fn metrics(&self) -> CacheMetrics {
        let mut inner = self.inner.lock();
        inner.purge(Instant::now());
        let live = inner.entries.len();
        inner.recorder.snapshot(live)
    }

    /// Zero hit/miss counters and the latency window
    pub fn reset_metrics(&self) {
        self.inner.lock().recorder.reset();
        tracing::info!(cache = %self.name, "cache metrics reset");
    }

    /// Return the cached value or compute, store, and return it
    pub async fn get_or_insert_with<F, Fut>(&self, key: &str, ttl: Duration, f: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(cached) = self.get(key) {
            return cached;
        }

        let value = f().await;
        self.set(key, value.clone(), ttl);
        value
    }

    /// Fallible variant of `get_or_insert_with`; errors are not cached
    pub async fn try_get_or_insert_with<E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        f: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(cached) = self.get(key) {
            return Ok(cached);
        }

        let value = f().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    fn emit_latency(&self, op: &'static str, elapsed: Duration) {
        metrics::histogram!("nav_cache_op_seconds", "cache" => self.name.clone(), "op" => op)
            .record(elapsed.as_secs_f64());
    }
}
