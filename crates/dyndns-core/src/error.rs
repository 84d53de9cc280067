//! Error types for the dyndns reconciler
//!
//! This module defines all error types used throughout the crate.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for reconciler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dyndns reconciler
#[derive(Error, Debug)]
pub enum Error {
    /// The external IP could not be determined
    #[error("IP resolution failed: {0}")]
    IpResolution(String),

    /// The DNS provider rejected the update (carries the raw response)
    #[error("DNS update failed: {0}")]
    Update(String),

    /// The credential secret referenced by a record does not exist
    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    /// Writing the observed state back to the record store failed
    #[error("Failed to persist status for {key}: {message}")]
    StatusPersist {
        /// Record key
        key: String,
        /// Underlying store error
        message: String,
        /// Fixed delay before the dispatcher retries the record
        retry_after: Duration,
    },

    /// Record store errors
    #[error("Record store error: {0}")]
    Store(String),

    /// Secret store errors
    #[error("Secret store error: {0}")]
    Secret(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A cycle exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an IP resolution error
    pub fn ip_resolution(msg: impl Into<String>) -> Self {
        Self::IpResolution(msg.into())
    }

    /// Create a DNS update error
    pub fn update(msg: impl Into<String>) -> Self {
        Self::Update(msg.into())
    }

    /// Create a "credential not found" error
    pub fn credential_not_found(msg: impl Into<String>) -> Self {
        Self::CredentialNotFound(msg.into())
    }

    /// Create a status persistence error with its retry delay
    pub fn status_persist(
        key: impl Into<String>,
        message: impl Into<String>,
        retry_after: Duration,
    ) -> Self {
        Self::StatusPersist {
            key: key.into(),
            message: message.into(),
            retry_after,
        }
    }

    /// Create a record store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a secret store error
    pub fn secret(msg: impl Into<String>) -> Self {
        Self::Secret(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Fixed retry delay requested by this error, if any
    ///
    /// Errors without a fixed delay are retried by the dispatcher with
    /// per-key exponential backoff.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::StatusPersist { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
