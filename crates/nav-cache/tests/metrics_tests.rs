//! Hit/miss accounting, TTL, and aggregation behavior across the public API

use nav_cache::prelude::*;
use nav_cache::{EMBEDDING_CACHE, EXTERNAL_PRICING_CACHE, RAG_CACHE};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Op {
    Set(u8),
    Get(u8),
    Del(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Set),
        (0u8..8).prop_map(Op::Get),
        (0u8..8).prop_map(Op::Del),
    ]
}

proptest! {
    #[test]
    fn hits_plus_misses_equals_gets(ops in proptest::collection::vec(op_strategy(), 0..200)) {
        let cache: MetricsCache<u32> = MetricsCache::new("prop", &CacheConfig::default());
        let mut gets = 0u64;

        for op in &ops {
            match op {
                Op::Set(k) => {
                    cache.set(format!("k{k}"), u32::from(*k), Duration::from_secs(600));
                }
                Op::Get(k) => {
                    gets += 1;
                    cache.get(&format!("k{k}"));
                }
                Op::Del(k) => {
                    cache.del(&format!("k{k}"));
                }
            }
        }

        let metrics = cache.metrics();
        prop_assert_eq!(metrics.hits + metrics.misses, gets);
        let expected = if gets == 0 { 0.0 } else { metrics.hits as f64 / gets as f64 };
        prop_assert!((metrics.hit_rate - expected).abs() < 1e-12);
        prop_assert!(!metrics.hit_rate.is_nan());
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_set_get_expire() {
    let cache: MetricsCache<String> = MetricsCache::new("scenario", &CacheConfig::default());

    assert!(cache.set("k", "v1".to_string(), Duration::from_secs(1)));
    assert_eq!(cache.get("k").as_deref(), Some("v1"));
    assert_eq!(cache.metrics().hits, 1);

    tokio::time::sleep(Duration::from_millis(1_200)).await;

    assert_eq!(cache.get("k"), None);
    let metrics = cache.metrics();
    assert_eq!(metrics.misses, 1);
    assert!((metrics.hit_rate - 0.5).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn ttl_boundaries_for_several_lifetimes() {
    let cache: MetricsCache<u8> = MetricsCache::new("ttl", &CacheConfig::default());
    let epsilon = Duration::from_millis(5);

    for secs in [1u64, 3, 30, 300] {
        let ttl = Duration::from_secs(secs);
        let key = format!("ttl-{secs}");
        cache.set(key.clone(), 1, ttl);

        tokio::time::advance(ttl - epsilon).await;
        assert!(cache.get(&key).is_some(), "expected hit before {secs}s");

        tokio::time::advance(epsilon * 2).await;
        assert!(cache.get(&key).is_none(), "expected miss after {secs}s");
    }

    let metrics = cache.metrics();
    assert_eq!(metrics.hits, 4);
    assert_eq!(metrics.misses, 4);
}

#[test]
fn clear_preserves_lifetime_counters() {
    let cache: MetricsCache<u8> = MetricsCache::new("clear", &CacheConfig::default());
    for i in 0..5u8 {
        cache.set(format!("k{i}"), i, Duration::from_secs(60));
    }
    cache.mget(&["k0", "k1", "zz"]);
    let before = cache.metrics();

    cache.clear();

    let after = cache.metrics();
    assert_eq!(cache.keys().len(), 0);
    assert_eq!(after.hits, before.hits);
    assert_eq!(after.misses, before.misses);
    assert_eq!(after.keys, 0);
}

#[test]
fn concurrent_gets_lose_no_counts() {
    let cache: Arc<MetricsCache<u64>> =
        Arc::new(MetricsCache::new("threads", &CacheConfig::default()));
    cache.set("shared", 7, Duration::from_secs(600));

    let threads: Vec<_> = (0..8)
        .map(|t| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for i in 0..500u64 {
                    if i % 2 == 0 {
                        cache.get("shared");
                    } else {
                        cache.get("absent");
                    }
                    if i % 50 == 0 {
                        cache.set("shared", t, Duration::from_secs(600));
                    }
                }
            })
        })
        .collect();
    for handle in threads {
        handle.join().unwrap();
    }

    let metrics = cache.metrics();
    assert_eq!(metrics.hits, 2_000);
    assert_eq!(metrics.misses, 2_000);
    assert_eq!(metrics.keys, 1);
}

#[test]
fn global_view_sums_instances() {
    let registry = CacheRegistry::create(CacheConfig::default()).unwrap();
    let embedding = registry.cache(EMBEDDING_CACHE).unwrap();
    let rag = registry.cache(RAG_CACHE).unwrap();
    let pricing = registry.cache(EXTERNAL_PRICING_CACHE).unwrap();

    embedding.set("e1", json!([0.1, 0.2, 0.3]), Duration::from_secs(60));
    embedding.get("e1");
    embedding.get("e2");
    rag.set("r1", json!({"answer": "yes", "citations": ["7 CFR 273.9"]}), Duration::from_secs(60));
    rag.get("r1");
    rag.get("r1");
    pricing.get("p1");

    let view = registry.global_view();
    let sum = |f: fn(&CacheMetrics) -> u64| view.caches.values().map(f).sum::<u64>();

    assert_eq!(view.overall.total_hits, sum(|m| m.hits));
    assert_eq!(view.overall.total_misses, sum(|m| m.misses));
    assert_eq!(view.overall.total_keys, sum(|m| m.keys));
    assert_eq!(view.overall.total_memory_bytes, sum(|m| m.memory_usage_bytes));
    assert_eq!(view.overall.total_hits, 3);
    assert_eq!(view.overall.total_misses, 2);
    assert!((view.overall.overall_hit_rate - 0.6).abs() < 1e-12);
}

#[tokio::test(start_paused = true)]
async fn sweeper_reclaims_untouched_entries() {
    let config = CacheConfig::new().with_sweep_interval(Duration::from_secs(10));
    let registry = CacheRegistry::create(config).unwrap();
    let document = registry.cache(nav_cache::DOCUMENT_CACHE).unwrap();
    document.set("doc", json!({"pages": 3}), Duration::from_secs(5));

    assert!(registry.start_sweeper());
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert_eq!(registry.purge_expired(), 0);
    let metrics = document.metrics();
    assert_eq!(metrics.keys, 0);
    assert_eq!(metrics.memory_usage_bytes, 0);
    assert_eq!(metrics.misses, 0);

    registry.shutdown();
}
