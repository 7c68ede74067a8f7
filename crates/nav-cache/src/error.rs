//! Error types for the cache layer
//!
//! Cache lookups never fail: a missing or expired key is an ordinary,
//! counted miss. The errors here cover configuration and registry
//! management only.

/// Errors raised by cache construction and registry management
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Cache name is empty or otherwise unusable
    #[error("invalid cache name: '{0}'")]
    InvalidName(String),

    /// A cache with this name is already registered
    #[error("cache already registered: '{0}'")]
    AlreadyRegistered(String),

    /// No cache with this name is registered
    #[error("unknown cache: '{0}'")]
    UnknownCache(String),

    /// Configuration value out of range
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// Registry has been shut down
    #[error("cache registry is shut down")]
    ShutDown,
}

impl CacheError {
    /// Create configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias for cache management operations
pub type CacheResult<T> = Result<T, CacheError>;
