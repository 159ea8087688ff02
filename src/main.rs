use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use dsql_rotation::{
    auth::{AuthTokenGenerator, DsqlTokenSigner},
    init_tracing,
    observability::log_config_info,
    secrets::AwsSecretsManagerStore,
    storage::{HttpCertificateProvider, PgConnector},
    ConnectionValidator, RotationConfig, RotationCoordinator, RotationEvent, APP_NAME, VERSION,
};
use lambda_runtime::{service_fn, LambdaEvent};
use tracing::{error, info};

fn install_rustls_provider() {
    use rustls::crypto::{ring, CryptoProvider};

    if CryptoProvider::get_default().is_none() {
        ring::default_provider().install_default().expect("install ring crypto provider");
    }
}

async fn build_coordinator(config: &RotationConfig) -> dsql_rotation::Result<RotationCoordinator> {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;

    let store = AwsSecretsManagerStore::from_sdk_config(
        &sdk_config,
        config.secrets_endpoint.as_deref(),
    );
    let tokens =
        AuthTokenGenerator::new(Arc::new(DsqlTokenSigner::new(sdk_config)), config.region.clone());
    let certificates =
        HttpCertificateProvider::new(config.root_cert_url.clone(), config.cert_timeout())?;
    let validator = ConnectionValidator::new(Arc::new(certificates), Arc::new(PgConnector));

    Ok(RotationCoordinator::new(Arc::new(store), tokens, validator)
        .with_rotation_token_expiry(config.token_expiry()))
}

async fn handle(
    coordinator: Arc<RotationCoordinator>,
    event: LambdaEvent<RotationEvent>,
) -> Result<(), lambda_runtime::Error> {
    let (payload, context) = event.into_parts();

    coordinator.handle_rotation_event(&payload).await.map_err(|e| {
        error!(
            request_id = %context.request_id,
            secret_id = %payload.secret_id,
            step = %payload.step,
            retryable = e.is_retryable(),
            error = %e,
            "Rotation step failed"
        );
        e.into()
    })
}

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    install_rustls_provider();

    // Load .env file if it exists (optional - won't fail if missing)
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let config = RotationConfig::from_env()?;
    init_tracing(&config.observability)?;

    info!(app_name = APP_NAME, version = VERSION, "Starting DSQL rotation handler");
    log_config_info(&config);

    let coordinator = Arc::new(build_coordinator(&config).await?);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<RotationEvent>| {
        let coordinator = coordinator.clone();
        async move { handle(coordinator, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rustls_provider_install_is_repeatable() {
        install_rustls_provider();
        install_rustls_provider();
        assert!(rustls::crypto::CryptoProvider::get_default().is_some());
    }
}
