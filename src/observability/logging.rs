//! # Structured Logging
//!
//! Span macros and start-up logging for the rotation handler.
//!
//! Every invocation runs inside a `rotation` span carrying the secret id,
//! the step, the attempt token and a random invocation id, so all events of
//! one phase can be correlated in the log stream. Secret material is carried
//! as [`SecretString`](crate::secrets::SecretString) and never reaches a field.

/// Create a tracing span for one rotation invocation.
///
/// ```rust,ignore
/// let span = rotation_span!(event.secret_id, event.step, event.client_request_token);
/// ```
#[macro_export]
macro_rules! rotation_span {
    ($secret_id:expr, $step:expr, $token:expr) => {
        tracing::info_span!(
            "rotation",
            secret_id = %$secret_id,
            step = %$step,
            token = %$token,
            invocation_id = %uuid::Uuid::new_v4()
        )
    };
    ($secret_id:expr, $step:expr, $token:expr, $($field:tt)*) => {
        tracing::info_span!(
            "rotation",
            secret_id = %$secret_id,
            step = %$step,
            token = %$token,
            invocation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::RotationConfig) {
    tracing::info!(
        region = %config.region,
        root_cert_url = %config.root_cert_url,
        cert_timeout_seconds = config.cert_timeout_seconds,
        token_expiry_seconds = config.token_expiry_seconds,
        secrets_endpoint = ?config.secrets_endpoint,
        json_logging = config.observability.json_logging,
        "DSQL rotation handler configuration"
    );
}
