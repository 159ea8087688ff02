//! # Error Handling
//!
//! Error taxonomy of the rotation handler, built with `thiserror`.
//!
//! Precondition failures (`Configuration`, `InvalidVersion`, `InvalidStage`,
//! `InvalidStep`, `SecretShape`) abort the invocation and will fail again on
//! retry. `Validation` and the transport-level failures are worth retrying
//! once the cause is fixed.

pub mod connection;

pub use connection::{ConnectionFailure, TierFailure};

use crate::secrets::SecretsError;

/// Custom result type for rotation operations
pub type Result<T> = std::result::Result<T, RotationError>;

/// Main error type for the rotation handler
#[derive(thiserror::Error, Debug)]
pub enum RotationError {
    /// Rotation disabled for the secret, or invalid process configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Attempt token has no stage in the secret's version map
    #[error("Secret version {token} has no stage for rotation of secret {secret_id}")]
    InvalidVersion { secret_id: String, token: String },

    /// Attempt token is neither current nor pending
    #[error("Secret version {token} not set as AWSPENDING for rotation of secret {secret_id}")]
    InvalidStage { secret_id: String, token: String },

    /// Unknown rotation step
    #[error("Invalid step parameter {step} for secret {secret_id}")]
    InvalidStep { secret_id: String, step: String },

    /// Secret JSON is missing a field or names an unsupported engine
    #[error("Secret shape error: {message}")]
    SecretShape { message: String },

    /// Pending credential failed to authenticate or answer the liveness query
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<ConnectionFailure>>,
    },

    /// Both TLS tiers failed
    #[error(transparent)]
    ConnectionFailure(#[from] ConnectionFailure),

    /// Token signer rejected the request
    #[error("Token generation failed: {message}")]
    TokenGeneration { message: String },

    /// Trust anchor could not be acquired
    #[error("Certificate error: {message}")]
    Certificate { message: String },

    /// Secret store errors
    #[error(transparent)]
    Secrets(#[from] SecretsError),
}

impl RotationError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create an invalid version error
    pub fn invalid_version<S: Into<String>, T: Into<String>>(secret_id: S, token: T) -> Self {
        Self::InvalidVersion { secret_id: secret_id.into(), token: token.into() }
    }

    /// Create an invalid stage error
    pub fn invalid_stage<S: Into<String>, T: Into<String>>(secret_id: S, token: T) -> Self {
        Self::InvalidStage { secret_id: secret_id.into(), token: token.into() }
    }

    /// Create an invalid step error
    pub fn invalid_step<S: Into<String>, T: Into<String>>(secret_id: S, step: T) -> Self {
        Self::InvalidStep { secret_id: secret_id.into(), step: step.into() }
    }

    /// Create a secret shape error
    pub fn secret_shape<S: Into<String>>(message: S) -> Self {
        Self::SecretShape { message: message.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), source: None }
    }

    /// Create a validation error caused by exhausting both TLS tiers
    pub fn validation_with_failure<S: Into<String>>(message: S, failure: ConnectionFailure) -> Self {
        Self::Validation { message: message.into(), source: Some(Box::new(failure)) }
    }

    /// Create a token generation error
    pub fn token_generation<S: Into<String>>(message: S) -> Self {
        Self::TokenGeneration { message: message.into() }
    }

    /// Create a certificate error
    pub fn certificate<S: Into<String>>(message: S) -> Self {
        Self::Certificate { message: message.into() }
    }

    /// Check if the orchestrator should retry the step
    pub fn is_retryable(&self) -> bool {
        match self {
            RotationError::Configuration { .. }
            | RotationError::InvalidVersion { .. }
            | RotationError::InvalidStage { .. }
            | RotationError::InvalidStep { .. }
            | RotationError::SecretShape { .. } => false,
            RotationError::Validation { .. }
            | RotationError::ConnectionFailure(_)
            | RotationError::TokenGeneration { .. }
            | RotationError::Certificate { .. } => true,
            RotationError::Secrets(err) => matches!(
                err,
                SecretsError::ConnectionFailed { .. } | SecretsError::BackendError { .. }
            ),
        }
    }
}

impl From<validator::ValidationErrors> for RotationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");
        Self::configuration(message)
    }
}
