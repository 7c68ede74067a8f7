//! Cache configuration

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default TTL applied by `set_default` (five minutes)
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Default number of response-time samples kept per cache
pub const DEFAULT_RESPONSE_WINDOW: usize = 1000;

/// Configuration shared by every cache instance in a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL used by `set_default`; zero means entries never expire
    pub default_ttl_secs: u64,
    /// Number of most recent operation durations averaged into
    /// `avg_response_time_ms`
    pub response_window: usize,
    /// Interval of the optional background sweep of expired entries
    pub sweep_interval_secs: Option<u64>,
}

impl CacheConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With default TTL
    #[inline]
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_secs = ttl.as_secs();
        self
    }

    /// With response-time sample window
    #[inline]
    #[must_use]
    pub fn with_response_window(mut self, window: usize) -> Self {
        self.response_window = window;
        self
    }

    /// With background sweep interval
    #[inline]
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_secs = Some(interval.as_secs());
        self
    }

    /// Default TTL as a duration
    #[inline]
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Sweep interval as a duration, if sweeping is enabled
    #[inline]
    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `CacheError::InvalidConfig` if the response window or sweep
    ///   interval is zero
    pub fn validate(&self) -> CacheResult<()> {
        if self.response_window == 0 {
            return Err(CacheError::invalid_config("response_window must be non-zero"));
        }
        if self.sweep_interval_secs == Some(0) {
            return Err(CacheError::invalid_config(
                "sweep_interval_secs must be non-zero when set",
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: DEFAULT_TTL_SECS,
            response_window: DEFAULT_RESPONSE_WINDOW,
            sweep_interval_secs: None,
        }
    }
}
