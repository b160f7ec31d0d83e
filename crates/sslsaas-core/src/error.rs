//! Error types for certificate issuance
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for issuance operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the issuance workflow
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configured managed-CNAME zone is not visible to the credentials
    #[error("Could not retrieve zone info for zone: {0}")]
    ZoneNotFound(String),

    /// The provider refused to create the custom hostname
    #[error("Custom hostname creation was rejected for {0}")]
    CreationRejected(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (transport level, no response received)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
        /// Whether repeating the same call later may succeed
        transient: bool,
    },

    /// TLS connection or handshake errors
    #[error("TLS error: {0}")]
    Tls(String),

    /// Certificate parsing errors
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Operation exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error that is not expected to clear on its own
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            transient: false,
        }
    }

    /// Create a provider-specific error for a transient condition (e.g. 5xx)
    pub fn provider_transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            transient: true,
        }
    }

    /// Create a TLS error
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    /// Create a certificate parsing error
    pub fn certificate(msg: impl Into<String>) -> Self {
        Self::Certificate(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Whether a status poll that failed with this error should simply be
    /// attempted again on the next tick.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_)
            | Error::Http(_)
            | Error::RateLimited(_)
            | Error::Timeout(_)
            | Error::Json(_) => true,
            Error::Provider { transient, .. } => *transient,
            _ => false,
        }
    }
}
