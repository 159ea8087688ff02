//! DSQL token signer backed by the AWS SDK.
//!
//! Admin tokens use `db_connect_admin_auth_token`, all others use
//! `db_connect_auth_token`. Credentials come from the shared SDK
//! configuration built once at start-up.

use async_trait::async_trait;
use aws_sdk_dsql::auth_token::{AuthTokenGenerator as SdkTokenGenerator, Config as SdkTokenConfig};
use aws_sdk_dsql::config::Region;

use super::token_generator::{TokenRequest, TokenScope, TokenSigner};
use crate::errors::{Result, RotationError};
use crate::secrets::SecretString;

/// [`TokenSigner`] that presigns DSQL `DbConnect`/`DbConnectAdmin` requests.
#[derive(Debug, Clone)]
pub struct DsqlTokenSigner {
    sdk_config: aws_config::SdkConfig,
}

impl DsqlTokenSigner {
    pub fn new(sdk_config: aws_config::SdkConfig) -> Self {
        Self { sdk_config }
    }
}

#[async_trait]
impl TokenSigner for DsqlTokenSigner {
    async fn sign(&self, request: &TokenRequest) -> Result<SecretString> {
        let config = SdkTokenConfig::builder()
            .hostname(request.host.as_str())
            .region(Region::new(request.region.clone()))
            .expires_in(request.expires_in.as_secs())
            .build()
            .map_err(|e| {
                RotationError::token_generation(format!("Invalid token request: {}", e))
            })?;
        let generator = SdkTokenGenerator::new(config);

        let token = match request.scope {
            TokenScope::Admin => generator.db_connect_admin_auth_token(&self.sdk_config).await,
            TokenScope::Standard => generator.db_connect_auth_token(&self.sdk_config).await,
        }
        .map_err(|e| {
            RotationError::token_generation(format!(
                "Failed to sign {} token for {}: {}",
                request.scope, request.host, e
            ))
        })?;

        Ok(SecretString::new(token.as_str()))
    }
}
