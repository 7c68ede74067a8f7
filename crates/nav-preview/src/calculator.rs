//! External calculation collaborator
//!
//! The controller only sees `EstimateCalculator`. `JsonCalculator` adapts
//! any request/response transport (status code plus body bytes) into that
//! contract and validates the answer at the boundary. `CachedCalculator`
//! memoizes successful answers in a metrics cache.

use crate::error::CalculatorError;
use crate::estimate::EstimateResult;
use crate::request::EstimateRequest;
use async_trait::async_trait;
use nav_cache::JsonCache;
use std::sync::Arc;
use std::time::Duration;

/// Computes an estimate for a normalized request
#[async_trait]
pub trait EstimateCalculator: Send + Sync {
    /// Compute, or fail with a classified error
    async fn calculate(&self, request: &EstimateRequest) -> Result<EstimateResult, CalculatorError>;
}

#[async_trait]
impl<C: EstimateCalculator + ?Sized> EstimateCalculator for Arc<C> {
    async fn calculate(&self, request: &EstimateRequest) -> Result<EstimateResult, CalculatorError> {
        (**self).calculate(request).await
    }
}

/// Raw answer from a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP-style status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Structured request in, structured response out
#[async_trait]
pub trait EstimateTransport: Send + Sync {
    /// Send a JSON body; network failures map to `CalculatorError::Transport`
    async fn post_json(&self, body: Vec<u8>) -> Result<TransportResponse, CalculatorError>;
}

/// Calculator speaking JSON over an `EstimateTransport`
#[derive(Debug, Clone)]
pub struct JsonCalculator<T> {
    transport: T,
}

impl<T: EstimateTransport> JsonCalculator<T> {
    /// Wrap a transport
    #[inline]
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Underlying transport
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: EstimateTransport> EstimateCalculator for JsonCalculator<T> {
    async fn calculate(&self, request: &EstimateRequest) -> Result<EstimateResult, CalculatorError> {
        let body =
            serde_json::to_vec(request).map_err(|e| CalculatorError::Encoding(e.to_string()))?;
        let response = self.transport.post_json(body).await?;

        if !response.is_success() {
            tracing::warn!(status = response.status, "calculator returned error status");
            return Err(CalculatorError::status(response.status, &response.body));
        }
        EstimateResult::from_json_slice(&response.body)
    }
}

/// Memoizes successful estimates by request key. Failures are not cached.
#[derive(Debug)]
pub struct CachedCalculator<C> {
    inner: C,
    cache: Arc<JsonCache>,
    ttl: Duration,
}

impl<C: EstimateCalculator> CachedCalculator<C> {
    /// Wrap `inner`, storing answers in `cache` for `ttl`
    #[inline]
    #[must_use]
    pub fn new(inner: C, cache: Arc<JsonCache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    /// Backing cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<JsonCache> {
        &self.cache
    }
}

#[async_trait]
impl<C: EstimateCalculator> EstimateCalculator for CachedCalculator<C> {
    async fn calculate(&self, request: &EstimateRequest) -> Result<EstimateResult, CalculatorError> {
        let key = request.cache_key();
        let value = self
            .cache
            .try_get_or_insert_with(&key, self.ttl, || async {
                let estimate = self.inner.calculate(request).await?;
                serde_json::to_value(&estimate).map_err(|e| CalculatorError::Encoding(e.to_string()))
            })
            .await?;

        serde_json::from_value(value).map_err(|e| CalculatorError::malformed(e.to_string()))
    }
}
