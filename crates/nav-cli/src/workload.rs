//! Synthetic cache traffic for `cache-report`

use anyhow::{ensure, Context};
use futures::future::join_all;
use nav_cache::{CacheConfig, CacheRegistry, GlobalCacheView, STANDARD_CACHES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

/// Shape of the generated traffic
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadOptions {
    /// Operations per cache
    pub ops: usize,
    /// Distinct keys per cache
    pub key_space: usize,
    /// Share of operations that write, in `[0, 1]`
    pub write_ratio: f64,
    /// RNG seed; each cache derives its own stream from it
    pub seed: u64,
}

impl Default for WorkloadOptions {
    fn default() -> Self {
        Self {
            ops: 1_000,
            key_space: 64,
            write_ratio: 0.3,
            seed: 42,
        }
    }
}

/// Run mixed reads and writes against every standard cache concurrently
/// and return the resulting global view.
///
/// # Errors
/// Invalid options or cache configuration
pub async fn run_cache_workload(
    config: &CacheConfig,
    options: &WorkloadOptions,
) -> anyhow::Result<GlobalCacheView> {
    ensure!(options.key_space > 0, "key space must be non-empty");
    ensure!(
        (0.0..=1.0).contains(&options.write_ratio),
        "write ratio {} is outside [0, 1]",
        options.write_ratio
    );

    let registry = CacheRegistry::create(config.clone()).context("creating cache registry")?;
    let ttl = config.default_ttl();

    let mut workers = Vec::with_capacity(STANDARD_CACHES.len());
    for (offset, name) in (0u64..).zip(STANDARD_CACHES) {
        let cache = registry.cache(name)?;
        let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(offset));
        workers.push(async move {
            for op in 0..options.ops {
                let key = format!("{name}:{}", rng.random_range(0..options.key_space));
                if rng.random_bool(options.write_ratio) {
                    cache.set(key, json!({ "op": op, "cache": name }), ttl);
                } else {
                    cache.get(&key);
                }
                if op % 64 == 63 {
                    tokio::task::yield_now().await;
                }
            }
        });
    }
    join_all(workers).await;

    let view = registry.global_view();
    tracing::info!(
        caches = view.caches.len(),
        hit_rate = view.overall.overall_hit_rate,
        "cache workload finished"
    );
    registry.shutdown();
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn reads_only_all_miss() {
        let options = WorkloadOptions {
            ops: 50,
            write_ratio: 0.0,
            ..WorkloadOptions::default()
        };
        let view = run_cache_workload(&CacheConfig::default(), &options).await.unwrap();

        assert_eq!(view.caches.len(), STANDARD_CACHES.len());
        assert_eq!(view.overall.total_hits, 0);
        assert_eq!(view.overall.total_misses, 200);
        assert_eq!(view.overall.overall_hit_rate, 0.0);
    }

    #[tokio::test]
    async fn writes_only_record_nothing() {
        let options = WorkloadOptions {
            ops: 50,
            key_space: 8,
            write_ratio: 1.0,
            ..WorkloadOptions::default()
        };
        let view = run_cache_workload(&CacheConfig::default(), &options).await.unwrap();

        assert_eq!(view.overall.total_hits + view.overall.total_misses, 0);
        assert!(view.overall.total_keys <= 32);
    }

    #[tokio::test]
    async fn mixed_traffic_accounts_every_read() {
        let options = WorkloadOptions::default();
        let view = run_cache_workload(&CacheConfig::default(), &options).await.unwrap();

        let lookups = view.overall.total_hits + view.overall.total_misses;
        assert!(lookups > 0);
        assert!(lookups <= 4 * options.ops as u64);
        for metrics in view.caches.values() {
            assert!(metrics.keys <= options.key_space as u64);
        }
    }

    #[tokio::test]
    async fn bad_options_rejected() {
        let config = CacheConfig::default();
        let empty = WorkloadOptions {
            key_space: 0,
            ..WorkloadOptions::default()
        };
        assert!(run_cache_workload(&config, &empty).await.is_err());

        let ratio = WorkloadOptions {
            write_ratio: 1.5,
            ..WorkloadOptions::default()
        };
        assert!(run_cache_workload(&config, &ratio).await.is_err());
    }
}
