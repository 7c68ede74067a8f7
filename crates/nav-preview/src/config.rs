//! Preview controller configuration

use crate::error::{PreviewError, PreviewResult};
use crate::inputs::{InputField, TrackedInputSet};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default quiet period before a recomputation fires
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Default limit on a single calculator call
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;

/// Debounce, minimum-data, and timeout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Quiet period after the last edit before recomputing
    pub debounce_ms: u64,
    /// Fields that must be present before any calculator call
    pub required_fields: Vec<InputField>,
    /// Limit on one calculator call; elapsed calls count as failures
    pub call_timeout_ms: u64,
}

impl PreviewConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With debounce interval
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With required fields
    #[inline]
    #[must_use]
    pub fn with_required_fields(mut self, fields: impl IntoIterator<Item = InputField>) -> Self {
        self.required_fields = fields.into_iter().collect();
        self
    }

    /// With call timeout
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Debounce interval
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Call timeout
    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Required fields absent from `inputs`; empty means computation may run
    #[must_use]
    pub fn missing_fields(&self, inputs: &TrackedInputSet) -> Vec<InputField> {
        self.required_fields
            .iter()
            .copied()
            .filter(|field| !field.is_present(inputs))
            .collect()
    }

    /// Whether `inputs` carry the minimum data for a computation
    #[inline]
    #[must_use]
    pub fn has_minimum_data(&self, inputs: &TrackedInputSet) -> bool {
        self.required_fields.iter().all(|field| field.is_present(inputs))
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `PreviewError::InvalidConfig` for a zero call timeout
    pub fn validate(&self) -> PreviewResult<()> {
        if self.call_timeout_ms == 0 {
            return Err(PreviewError::InvalidConfig(
                "call_timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            required_fields: vec![InputField::MaritalStatus],
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
        }
    }
}
