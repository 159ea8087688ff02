//! # Rotation Coordinator
//!
//! Drives the four-phase rotation protocol for one secret:
//!
//! | Phase | Effect |
//! |---|---|
//! | `createSecret` | stage a new document, with a fresh auth token as password, `AWSPENDING` |
//! | `setSecret` | nothing, the cluster accepts tokens directly |
//! | `testSecret` | log in with the pending document and run the liveness query |
//! | `finishSecret` | move `AWSCURRENT` onto the attempt token's version |
//!
//! Every phase is safe to retry. Before dispatch, the attempt token is
//! checked against the secret's version map; a token that is already
//! `AWSCURRENT` turns any phase into a no-op.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn, Instrument};

use crate::auth::{AuthTokenGenerator, ROTATION_TOKEN_EXPIRY};
use crate::domain::{RotationEvent, RotationStep, SecretDocument};
use crate::errors::{Result, RotationError};
use crate::secrets::{AttemptStage, SecretVersionStore, VersionStage};
use crate::services::ConnectionValidator;

#[derive(Clone)]
pub struct RotationCoordinator {
    store: Arc<dyn SecretVersionStore>,
    tokens: AuthTokenGenerator,
    validator: ConnectionValidator,
    rotation_token_expiry: Duration,
}

impl RotationCoordinator {
    pub fn new(
        store: Arc<dyn SecretVersionStore>,
        tokens: AuthTokenGenerator,
        validator: ConnectionValidator,
    ) -> Self {
        Self { store, tokens, validator, rotation_token_expiry: ROTATION_TOKEN_EXPIRY }
    }

    /// Override the expiry of tokens minted during createSecret.
    pub fn with_rotation_token_expiry(mut self, expiry: Duration) -> Self {
        self.rotation_token_expiry = expiry;
        self
    }

    /// Check the staging preconditions and run the requested phase.
    ///
    /// # Errors
    ///
    /// - [`RotationError::Configuration`] if rotation is disabled for the secret
    /// - [`RotationError::InvalidVersion`] if the token is not in the version map
    /// - [`RotationError::InvalidStage`] if the token is neither current nor pending
    /// - [`RotationError::InvalidStep`] if the step is not one of the four phases
    /// - any error of the phase itself
    pub async fn handle_rotation_event(&self, event: &RotationEvent) -> Result<()> {
        let span = crate::rotation_span!(event.secret_id, event.step, event.client_request_token);
        self.check_and_dispatch(event).instrument(span).await
    }

    async fn check_and_dispatch(&self, event: &RotationEvent) -> Result<()> {
        let secret_id = event.secret_id.as_str();
        let token = event.client_request_token.as_str();

        let description = self.store.describe_secret(secret_id).await?;
        if description.rotation_disabled() {
            error!(secret_id = %secret_id, "Secret is not enabled for rotation");
            return Err(RotationError::configuration(format!(
                "Secret {} is not enabled for rotation",
                secret_id
            )));
        }

        match description.attempt_stage(token) {
            None => {
                error!(secret_id = %secret_id, token = %token, "Secret version has no stage for rotation");
                return Err(RotationError::invalid_version(secret_id, token));
            }
            Some(AttemptStage::Current) => {
                info!(
                    secret_id = %secret_id,
                    token = %token,
                    "Secret version already set as AWSCURRENT"
                );
                return Ok(());
            }
            Some(AttemptStage::Other) => {
                error!(secret_id = %secret_id, token = %token, "Secret version not set as AWSPENDING");
                return Err(RotationError::invalid_stage(secret_id, token));
            }
            Some(AttemptStage::Pending) => {}
        }

        let step: RotationStep = event
            .step
            .parse()
            .map_err(|_| RotationError::invalid_step(secret_id, event.step.as_str()))?;

        match step {
            RotationStep::CreateSecret => self.create_secret(secret_id, token).await,
            RotationStep::SetSecret => self.set_secret(secret_id, token).await,
            RotationStep::TestSecret => self.test_secret(secret_id, token).await,
            RotationStep::FinishSecret => self.finish_secret(secret_id, token).await,
        }
    }

    /// Stage a new document under `token` with a freshly minted auth token.
    ///
    /// No-op when the pending version already has a value.
    #[instrument(skip(self))]
    pub async fn create_secret(&self, secret_id: &str, token: &str) -> Result<()> {
        let current = self.get_secret_document(secret_id, &VersionStage::Current, None).await?;

        match self.store.get_secret_value(secret_id, &VersionStage::Pending, Some(token)).await {
            Ok(_) => {
                info!(secret_id = %secret_id, "createSecret: pending version already exists");
                return Ok(());
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let password = self
            .tokens
            .generate_auth_token(current.host(), current.username(), self.rotation_token_expiry)
            .await?;
        let pending = current.with_password(password).to_secret_string()?;

        match self
            .store
            .put_secret_value(secret_id, token, &pending, &[VersionStage::Pending])
            .await
        {
            Ok(()) => {
                info!(secret_id = %secret_id, token = %token, "createSecret: staged new secret version");
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                info!(
                    secret_id = %secret_id,
                    token = %token,
                    "createSecret: version was staged by a concurrent attempt"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Nothing to apply; the cluster validates tokens itself.
    #[instrument(skip(self))]
    pub async fn set_secret(&self, secret_id: &str, token: &str) -> Result<()> {
        info!(secret_id = %secret_id, "setSecret: no action required for token-based credentials");
        Ok(())
    }

    /// Log in with the pending document and run the liveness query.
    ///
    /// # Errors
    ///
    /// [`RotationError::Validation`] if no session can be opened under either
    /// TLS tier, or the query fails.
    #[instrument(skip(self))]
    pub async fn test_secret(&self, secret_id: &str, token: &str) -> Result<()> {
        let pending =
            self.get_secret_document(secret_id, &VersionStage::Pending, Some(token)).await?;

        let tier = self.validator.validate_credential(&pending).await.map_err(|e| match e {
            RotationError::ConnectionFailure(failure) => RotationError::validation_with_failure(
                format!("Unable to log into database with pending secret of secret {}", secret_id),
                failure,
            ),
            other => other,
        })?;

        info!(secret_id = %secret_id, tier = %tier, "testSecret: pending secret accepted by database");
        Ok(())
    }

    /// Move `AWSCURRENT` onto `token`'s version.
    #[instrument(skip(self))]
    pub async fn finish_secret(&self, secret_id: &str, token: &str) -> Result<()> {
        let description = self.store.describe_secret(secret_id).await?;
        let current_version = description.current_version().map(str::to_string);

        if current_version.as_deref() == Some(token) {
            info!(secret_id = %secret_id, token = %token, "finishSecret: version already AWSCURRENT");
            return Ok(());
        }
        if current_version.is_none() {
            warn!(secret_id = %secret_id, "finishSecret: no version holds AWSCURRENT");
        }

        self.store
            .update_version_stage(secret_id, &VersionStage::Current, token, current_version.as_deref())
            .await?;

        info!(
            secret_id = %secret_id,
            token = %token,
            previous = ?current_version,
            "finishSecret: moved AWSCURRENT to new version"
        );
        Ok(())
    }

    /// Fetch and validate the document staged `stage` (and `token`, if given).
    pub async fn get_secret_document(
        &self,
        secret_id: &str,
        stage: &VersionStage,
        token: Option<&str>,
    ) -> Result<SecretDocument> {
        let secret_string = self.store.get_secret_value(secret_id, stage, token).await?;
        SecretDocument::parse(&secret_string)
    }
}

impl std::fmt::Debug for RotationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationCoordinator")
            .field("tokens", &self.tokens)
            .field("rotation_token_expiry", &self.rotation_token_expiry)
            .finish_non_exhaustive()
    }
}
