//! # Configuration Settings
//!
//! Process-level settings of the rotation handler, read once at start-up.

use crate::auth::ROTATION_TOKEN_EXPIRY;
use crate::errors::{Result, RotationError};
use crate::storage::{DEFAULT_CERT_FETCH_TIMEOUT, DEFAULT_ROOT_CERT_URL};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Rotation handler configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RotationConfig {
    /// Region used for token signing and the AWS clients
    #[validate(length(min = 1, message = "AWS region cannot be empty"))]
    pub region: String,

    /// Download URL of the root certificate for verified TLS
    #[validate(url(message = "Root certificate URL must be a valid URL"))]
    pub root_cert_url: String,

    /// Certificate download timeout in seconds
    #[validate(range(
        min = 1,
        max = 300,
        message = "Certificate timeout must be between 1 and 300 seconds"
    ))]
    pub cert_timeout_seconds: u64,

    /// Expiry of tokens minted during createSecret, in seconds
    #[validate(range(
        min = 1,
        max = 604800,
        message = "Token expiry must be between 1 second and 7 days"
    ))]
    pub token_expiry_seconds: u64,

    /// Optional Secrets Manager endpoint override
    #[validate(url(message = "Secrets endpoint must be a valid URL"))]
    pub secrets_endpoint: Option<String>,

    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl RotationConfig {
    /// Load and validate the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// [`RotationError::Configuration`] if `AWS_REGION` is missing, a value
    /// does not parse, or validation fails.
    pub fn from_env() -> Result<Self> {
        let region = std::env::var("AWS_REGION")
            .map_err(|_| RotationError::configuration("AWS_REGION environment variable not set"))?;

        let root_cert_url = std::env::var("DSQL_ROTATION_ROOT_CERT_URL")
            .unwrap_or_else(|_| DEFAULT_ROOT_CERT_URL.to_string());

        let cert_timeout_seconds = parse_var(
            "DSQL_ROTATION_CERT_TIMEOUT_SECONDS",
            DEFAULT_CERT_FETCH_TIMEOUT.as_secs(),
        )?;
        let token_expiry_seconds =
            parse_var("DSQL_ROTATION_TOKEN_EXPIRY_SECONDS", ROTATION_TOKEN_EXPIRY.as_secs())?;

        let secrets_endpoint =
            std::env::var("DSQL_ROTATION_SECRETS_ENDPOINT").ok().filter(|s| !s.is_empty());

        let config = Self {
            region,
            root_cert_url,
            cert_timeout_seconds,
            token_expiry_seconds,
            secrets_endpoint,
            observability: ObservabilityConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn cert_timeout(&self) -> Duration {
        Duration::from_secs(self.cert_timeout_seconds)
    }

    pub fn token_expiry(&self) -> Duration {
        Duration::from_secs(self.token_expiry_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log filter directive (trace, debug, info, warn, error, or an EnvFilter expression)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Result<Self> {
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let json_logging = std::env::var("DSQL_ROTATION_LOG_JSON")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(false);

        Ok(Self { log_level, json_logging })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| RotationError::configuration(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
