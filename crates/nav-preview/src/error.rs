//! Error types for the estimate preview
//!
//! Provides error handling for:
//! - Calls to the external calculation service (transport, status, payload)
//! - Inputs that cannot be normalized into a request
//! - Controller configuration

/// Failures of the external calculation collaborator
///
/// Every variant is transient from the controller's point of view: the
/// last good estimate is kept and the error is surfaced alongside it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalculatorError {
    /// Network or connection failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("calculator returned status {status}: {message}")]
    Status {
        /// HTTP-style status code
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// Response body did not describe a valid estimate
    #[error("malformed calculator response: {0}")]
    Malformed(String),

    /// No answer within the configured call timeout
    #[error("calculator timed out after {after_ms}ms")]
    Timeout {
        /// Timeout that elapsed
        after_ms: u64,
    },

    /// Request could not be encoded
    #[error("request encoding failed: {0}")]
    Encoding(String),
}

impl CalculatorError {
    /// Create transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create malformed-response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Create status error, truncating long bodies
    pub fn status(status: u16, body: &[u8]) -> Self {
        const MAX_EXCERPT: usize = 200;
        let text = String::from_utf8_lossy(body);
        let message: String = text.chars().take(MAX_EXCERPT).collect();
        Self::Status { status, message }
    }

    /// Check if the failure came from the network layer rather than the
    /// service's answer
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}

/// Errors surfaced by the preview controller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    /// Calculation collaborator failed
    #[error("estimate computation failed: {0}")]
    Compute(#[from] CalculatorError),

    /// Inputs present but unusable (non-finite amounts, impossible dates)
    #[error("invalid inputs: {0}")]
    InvalidInput(String),

    /// Configuration value out of range
    #[error("invalid preview configuration: {0}")]
    InvalidConfig(String),
}

impl PreviewError {
    /// Create invalid-input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Result type alias for preview operations
pub type PreviewResult<T> = Result<T, PreviewError>;
