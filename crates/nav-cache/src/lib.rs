//! Navigator cache layer
//!
//! TTL key/value caches that keep lifetime hit/miss, latency, and memory
//! statistics, grouped in an explicitly owned registry that can report a
//! global view across all named instances.
//!
//! # Architecture
//!
//! ```text
//! MetricsCache<V> (entries + MetricsRecorder under one lock)
//!        │ metrics()
//!        ▼
//! CacheRegistry ──global_view()──▶ GlobalCacheView { caches, overall }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nav_cache::{CacheConfig, CacheRegistry, EXTERNAL_PRICING_CACHE};
//! use std::time::Duration;
//!
//! let registry = CacheRegistry::create(CacheConfig::default())?;
//! let pricing = registry.cache(EXTERNAL_PRICING_CACHE)?;
//!
//! pricing.set("household:abc", serde_json::json!({"refund": 1200}), Duration::from_secs(60));
//! assert!(pricing.get("household:abc").is_some());
//!
//! let view = registry.global_view();
//! println!("overall hit rate {:.2}", view.overall.overall_hit_rate);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod size;

pub use cache::{Expiry, MetricsCache};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use metrics::{hit_rate, CacheMetrics};
pub use registry::{
    CacheRegistry, GlobalCacheView, JsonCache, MetricsSource, OverallCacheMetrics,
    DOCUMENT_CACHE, EMBEDDING_CACHE, EXTERNAL_PRICING_CACHE, RAG_CACHE, STANDARD_CACHES,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with caches
    pub use crate::cache::{Expiry, MetricsCache};
    pub use crate::config::CacheConfig;
    pub use crate::metrics::CacheMetrics;
    pub use crate::registry::{CacheRegistry, GlobalCacheView, JsonCache, MetricsSource};
}
