//! Error types for secret store operations.

use thiserror::Error;

/// Result type for secret store operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while talking to the secret store.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// Secret or secret version not found in the store.
    #[error("Secret not found: {key}")]
    NotFound { key: String },

    /// A version with this identifier already exists.
    #[error("Secret version already exists: {key}")]
    AlreadyExists { key: String },

    /// Failed to reach the secret store.
    #[error("Backend connection failed: {message}")]
    ConnectionFailed { message: String },

    /// The request was rejected because of its content or the secret's state.
    #[error("Invalid secret value: {reason}")]
    InvalidValue { reason: String },

    /// Backend-specific error.
    #[error("Backend error: {message}")]
    BackendError { message: String },
}

impl SecretsError {
    /// Create a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an already exists error.
    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists { key: key.into() }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create an invalid value error.
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self::InvalidValue { reason: reason.into() }
    }

    /// Create a backend error.
    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::BackendError { message: message.into() }
    }

    /// Whether the store reported the requested secret or version as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether a put was rejected because the version already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
