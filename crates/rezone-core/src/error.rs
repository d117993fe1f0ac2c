//! Error types for provider operations

use thiserror::Error;

/// Error returned by a `ComputeProvider` implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Resource does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Resource already exists or is in a conflicting state
    #[error("Resource conflict: {0}")]
    Conflict(String),

    /// Provider asked the caller to slow down
    #[error("Request throttled: {0}")]
    Throttled(String),

    /// Connection reset, timeout or similar
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// Provider rejected the request
    #[error("Provider API error ({status}) {code}: {message}")]
    Api {
        /// HTTP status
        status: u16,
        /// Provider error code
        code: String,
        /// Provider message
        message: String,
    },

    /// Provider endpoint could not be reached
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Response did not have the expected shape
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Create a malformed-response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Throttled(_) | Self::Transient(_) | Self::Unavailable(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the error means the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
