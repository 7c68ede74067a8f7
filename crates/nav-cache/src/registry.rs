//! Process-wide registry of named caches and the global metrics view
//!
//! The registry is an explicitly constructed object: callers create it,
//! hand `Arc`s of it to whoever needs a cache, and shut it down when done.
//! Aggregation is a pure read-time reduction over the current snapshot of
//! each registered cache.

use crate::cache::MetricsCache;
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::metrics::{hit_rate, CacheMetrics};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Embedding vectors for semantic search
pub const EMBEDDING_CACHE: &str = "embedding";
/// Retrieval-augmented answer fragments
pub const RAG_CACHE: &str = "rag";
/// Document analysis results
pub const DOCUMENT_CACHE: &str = "document";
/// Responses from the external benefit/tax calculation service
pub const EXTERNAL_PRICING_CACHE: &str = "external-pricing";

/// Names of the caches every registry starts with
pub const STANDARD_CACHES: [&str; 4] = [
    EMBEDDING_CACHE,
    RAG_CACHE,
    DOCUMENT_CACHE,
    EXTERNAL_PRICING_CACHE,
];

/// Cache holding arbitrary JSON values
pub type JsonCache = MetricsCache<serde_json::Value>;

/// Type-erased view of a cache, enough for aggregation and lifecycle
pub trait MetricsSource: Send + Sync + std::fmt::Debug {
    /// Cache name
    fn name(&self) -> &str;
    /// Statistics snapshot
    fn metrics(&self) -> CacheMetrics;
    /// Remove all entries
    fn clear(&self);
    /// Remove all entries and refuse further writes
    fn close(&self);
    /// Evict expired entries
    fn purge_expired(&self) -> usize;
}

impl<V> MetricsSource for MetricsCache<V>
where
    V: Clone + Serialize + Send + Sync,
{
    fn name(&self) -> &str {
        MetricsCache::name(self)
    }

    fn metrics(&self) -> CacheMetrics {
        MetricsCache::metrics(self)
    }

    fn clear(&self) {
        MetricsCache::clear(self);
    }

    fn close(&self) {
        MetricsCache::close(self);
    }

    fn purge_expired(&self) -> usize {
        MetricsCache::purge_expired(self)
    }
}

/// Totals across every registered cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallCacheMetrics {
    /// Sum of hits
    pub total_hits: u64,
    /// Sum of misses
    pub total_misses: u64,
    /// `total_hits / (total_hits + total_misses)`, or 0
    pub overall_hit_rate: f64,
    /// Sum of live keys
    pub total_keys: u64,
    /// Sum of approximate memory usage
    pub total_memory_bytes: u64,
}

/// Per-cache metrics plus overall totals, computed on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalCacheView {
    /// Metrics keyed by cache name
    pub caches: BTreeMap<String, CacheMetrics>,
    /// Totals
    pub overall: OverallCacheMetrics,
}

impl GlobalCacheView {
    /// Reduce a set of per-cache snapshots
    #[must_use]
    pub fn from_snapshots(caches: BTreeMap<String, CacheMetrics>) -> Self {
        let (total_hits, total_misses, total_keys, total_memory_bytes) = caches.values().fold(
            (0u64, 0u64, 0u64, 0u64),
            |(hits, misses, keys, memory), m| {
                (
                    hits + m.hits,
                    misses + m.misses,
                    keys + m.keys,
                    memory.saturating_add(m.memory_usage_bytes),
                )
            },
        );

        Self {
            caches,
            overall: OverallCacheMetrics {
                total_hits,
                total_misses,
                overall_hit_rate: hit_rate(total_hits, total_misses),
                total_keys,
                total_memory_bytes,
            },
        }
    }
}

/// Registry of named cache instances
#[derive(Debug)]
pub struct CacheRegistry {
    config: CacheConfig,
    sources: DashMap<String, Arc<dyn MetricsSource>>,
    json_caches: DashMap<String, Arc<JsonCache>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl CacheRegistry {
    /// Create a registry holding the four standard JSON caches
    ///
    /// # Errors
    /// - `CacheError::InvalidConfig` if the configuration is out of range
    pub fn create(config: CacheConfig) -> CacheResult<Arc<Self>> {
        config.validate()?;

        let registry = Self {
            config,
            sources: DashMap::new(),
            json_caches: DashMap::new(),
            sweeper: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        };
        for name in STANDARD_CACHES {
            registry.create_json_cache(name)?;
        }

        tracing::info!(caches = registry.sources.len(), "cache registry created");
        Ok(Arc::new(registry))
    }

    /// Configuration shared by caches created through this registry
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Create and register a new JSON cache
    ///
    /// # Errors
    /// - `CacheError::InvalidName` for an empty name
    /// - `CacheError::AlreadyRegistered` if the name is taken
    /// - `CacheError::ShutDown` after `shutdown`
    pub fn create_json_cache(&self, name: &str) -> CacheResult<Arc<JsonCache>> {
        let cache = Arc::new(JsonCache::new(name, &self.config));
        self.register(cache.clone())?;
        self.json_caches.insert(name.to_string(), cache.clone());
        Ok(cache)
    }

    /// Register a cache built elsewhere (any value type)
    ///
    /// # Errors
    /// - `CacheError::InvalidName` for an empty name
    /// - `CacheError::AlreadyRegistered` if the name is taken
    /// - `CacheError::ShutDown` after `shutdown`
    pub fn register(&self, source: Arc<dyn MetricsSource>) -> CacheResult<()> {
        if self.is_shut_down() {
            return Err(CacheError::ShutDown);
        }
        let name = source.name().to_string();
        if name.trim().is_empty() {
            return Err(CacheError::InvalidName(name));
        }

        match self.sources.entry(name) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                Err(CacheError::AlreadyRegistered(entry.key().clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                tracing::debug!(cache = %entry.key(), "cache registered");
                entry.insert(source);
                Ok(())
            }
        }
    }

    /// JSON cache by name
    ///
    /// # Errors
    /// - `CacheError::UnknownCache` if no JSON cache has that name
    pub fn cache(&self, name: &str) -> CacheResult<Arc<JsonCache>> {
        self.json_caches
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CacheError::UnknownCache(name.to_string()))
    }

    /// Metrics for one cache
    ///
    /// # Errors
    /// - `CacheError::UnknownCache` if nothing is registered under `name`
    pub fn metrics(&self, name: &str) -> CacheResult<CacheMetrics> {
        self.sources
            .get(name)
            .map(|entry| entry.value().metrics())
            .ok_or_else(|| CacheError::UnknownCache(name.to_string()))
    }

    /// Registered cache names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Aggregate view over every registered cache
    #[must_use]
    pub fn global_view(&self) -> GlobalCacheView {
        let snapshots = self
            .sources
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().metrics()))
            .collect();
        GlobalCacheView::from_snapshots(snapshots)
    }

    /// Evict expired entries from every cache
    pub fn purge_expired(&self) -> usize {
        self.sources
            .iter()
            .map(|entry| entry.value().purge_expired())
            .sum()
    }

    /// Spawn the background sweep if `sweep_interval_secs` is configured.
    ///
    /// Returns `true` when a sweeper is running after the call. Must be
    /// called from within a Tokio runtime.
    pub fn start_sweeper(self: &Arc<Self>) -> bool {
        let Some(interval) = self.config.sweep_interval() else {
            return false;
        };
        if self.is_shut_down() {
            return false;
        }

        let mut slot = self.sweeper.lock();
        // shutdown may have run between the check above and taking the slot
        if self.is_shut_down() {
            return false;
        }
        if slot.is_some() {
            return true;
        }

        let registry = Arc::downgrade(self);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let purged = registry.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "swept expired cache entries");
                }
            }
        }));
        tracing::info!(interval_secs = interval.as_secs(), "cache sweeper started");
        true
    }

    /// Whether `shutdown` has been called
    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Stop the sweeper and close every cache. Counters are kept so a
    /// final `global_view` still reports lifetime statistics; handles held
    /// elsewhere stop accepting writes.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        for entry in &self.sources {
            entry.value().close();
        }
        tracing::info!("cache registry shut down");
    }
}

impl Drop for CacheRegistry {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}
