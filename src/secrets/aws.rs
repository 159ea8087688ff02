//! AWS Secrets Manager implementation of the staging API.
//!
//! ## Configuration
//!
//! Credentials and region come from the standard AWS provider chain
//! (`aws-config`). An endpoint override can be set with
//! `DSQL_ROTATION_SECRETS_ENDPOINT` for VPC endpoints or local emulators.

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::Client;
use tracing::debug;

use super::client::SecretVersionStore;
use super::error::{Result, SecretsError};
use super::types::{SecretDescription, SecretString, VersionStage};

/// Secrets Manager backed [`SecretVersionStore`].
///
/// Holds only the SDK client, which is safe to share across invocations.
#[derive(Debug, Clone)]
pub struct AwsSecretsManagerStore {
    client: Client,
}

impl AwsSecretsManagerStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from shared SDK configuration, honouring an optional
    /// endpoint override.
    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig, endpoint: Option<&str>) -> Self {
        let mut builder = aws_sdk_secretsmanager::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Self::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl SecretVersionStore for AwsSecretsManagerStore {
    async fn describe_secret(&self, secret_id: &str) -> Result<SecretDescription> {
        let output = self
            .client
            .describe_secret()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|err| map_sdk_error("describe_secret", secret_id, err))?;

        Ok(SecretDescription {
            rotation_enabled: output.rotation_enabled(),
            version_ids_to_stages: output.version_ids_to_stages().cloned().unwrap_or_default(),
        })
    }

    async fn get_secret_value(
        &self,
        secret_id: &str,
        stage: &VersionStage,
        version_id: Option<&str>,
    ) -> Result<SecretString> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .version_stage(stage.as_str())
            .set_version_id(version_id.map(str::to_string))
            .send()
            .await
            .map_err(|err| map_sdk_error("get_secret_value", secret_id, err))?;

        debug!(secret_id = %secret_id, stage = %stage, "Fetched secret value");

        output.secret_string().map(SecretString::from).ok_or_else(|| {
            SecretsError::invalid_value(format!(
                "secret {} staged {} has no SecretString",
                secret_id, stage
            ))
        })
    }

    async fn put_secret_value(
        &self,
        secret_id: &str,
        version_id: &str,
        secret_string: &SecretString,
        stages: &[VersionStage],
    ) -> Result<()> {
        self.client
            .put_secret_value()
            .secret_id(secret_id)
            .client_request_token(version_id)
            .secret_string(secret_string.expose_secret())
            .set_version_stages(Some(stages.iter().map(|s| s.as_str().to_string()).collect()))
            .send()
            .await
            .map_err(|err| map_sdk_error("put_secret_value", secret_id, err))?;
        Ok(())
    }

    async fn update_version_stage(
        &self,
        secret_id: &str,
        stage: &VersionStage,
        move_to_version: &str,
        remove_from_version: Option<&str>,
    ) -> Result<()> {
        self.client
            .update_secret_version_stage()
            .secret_id(secret_id)
            .version_stage(stage.as_str())
            .move_to_version_id(move_to_version)
            .set_remove_from_version_id(remove_from_version.map(str::to_string))
            .send()
            .await
            .map_err(|err| map_sdk_error("update_secret_version_stage", secret_id, err))?;
        Ok(())
    }
}

fn map_sdk_error<E>(operation: &str, secret_id: &str, err: SdkError<E>) -> SecretsError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(context) => match context.err().code() {
            Some("ResourceNotFoundException") => SecretsError::not_found(secret_id),
            Some("ResourceExistsException") => SecretsError::already_exists(secret_id),
            Some("InvalidRequestException") | Some("InvalidParameterException") => {
                SecretsError::invalid_value(format!(
                    "{} rejected: {}",
                    operation,
                    context.err().message().unwrap_or("no message")
                ))
            }
            _ => SecretsError::backend_error(format!("{} failed: {}", operation, err)),
        },
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            SecretsError::connection_failed(format!("{} failed: {}", operation, err))
        }
        _ => SecretsError::backend_error(format!("{} failed: {}", operation, err)),
    }
}
