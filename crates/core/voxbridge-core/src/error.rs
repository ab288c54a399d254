//! Error types for VoxBridge

use thiserror::Error;

/// Main error type for VoxBridge operations
#[derive(Error, Debug)]
pub enum VoxError {
    /// Configuration error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No backend could be resolved for a request
    #[error("No TTS backend available")]
    NoBackendAvailable,

    /// The resolved backend cannot serve the request's chat scope
    #[error("Backend '{backend}' is restricted to group chats and no scope-compatible fallback exists")]
    ScopeMismatch {
        /// The rejected backend id
        backend: String,
    },

    /// The requested voice is not known to the backend
    #[error("Unknown voice '{voice}' for backend '{backend}'")]
    UnknownVoice {
        /// Backend id
        backend: String,
        /// The unresolvable voice name
        voice: String,
    },

    /// Text exceeds the configured maximum length
    #[error("Text exceeds maximum length: {length} > {max}")]
    TextTooLong {
        /// Actual text length in characters
        length: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Backend invocation exceeded its timeout
    #[error("Backend '{backend}' timed out after {secs}s")]
    BackendTimeout {
        /// Backend id
        backend: String,
        /// Timeout that fired
        secs: u64,
    },

    /// Backend-side credential or configuration failure (not retried)
    #[error("Backend configuration error: {0}")]
    BackendConfig(String),

    /// Transient backend failure (network, 5xx); retried once before surfacing
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Fetching a remote audio reference for delivery failed
    #[error("Delivery fetch error: {0}")]
    DeliveryFetch(String),

    /// Writing the audio artifact to disk failed
    #[error("Delivery write error: {0}")]
    DeliveryWrite(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using VoxError
pub type Result<T> = std::result::Result<T, VoxError>;

impl VoxError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        VoxError::Config(msg.into())
    }

    /// Create a backend configuration error
    pub fn backend_config(msg: impl Into<String>) -> Self {
        VoxError::BackendConfig(msg.into())
    }

    /// Create a backend unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        VoxError::BackendUnavailable(msg.into())
    }

    /// Create a delivery fetch error
    pub fn delivery_fetch(msg: impl Into<String>) -> Self {
        VoxError::DeliveryFetch(msg.into())
    }

    /// Create a delivery write error
    pub fn delivery_write(msg: impl Into<String>) -> Self {
        VoxError::DeliveryWrite(msg.into())
    }

    /// Whether a failed backend invocation may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VoxError::BackendUnavailable(_) | VoxError::Network(_)
        )
    }
}
