//! Core secret store trait.

use async_trait::async_trait;

use super::error::Result;
use super::types::{SecretDescription, SecretString, VersionStage};

/// Multi-version secret store with stage labels.
///
/// This is the staging API the rotation protocol is written against. Every
/// version's content is immutable once written; only stage labels move.
///
/// # Security Considerations
///
/// - Implementations MUST NOT log secret values
/// - Network communication MUST use TLS
#[async_trait]
pub trait SecretVersionStore: Send + Sync {
    /// Fetch the rotation flag and the version-to-stages map of a secret.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::NotFound`](super::SecretsError::NotFound) if the secret doesn't exist
    async fn describe_secret(&self, secret_id: &str) -> Result<SecretDescription>;

    /// Fetch the secret string of the version holding `stage`.
    ///
    /// When `version_id` is given, the store must also check that this
    /// version is the one holding `stage`.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::NotFound`](super::SecretsError::NotFound) if no such version exists
    async fn get_secret_value(
        &self,
        secret_id: &str,
        stage: &VersionStage,
        version_id: Option<&str>,
    ) -> Result<SecretString>;

    /// Create a new version `version_id` with `secret_string`, attaching `stages`.
    ///
    /// Attaching a stage moves it off whichever version held it before.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::AlreadyExists`](super::SecretsError::AlreadyExists) if the
    ///   version exists already
    async fn put_secret_value(
        &self,
        secret_id: &str,
        version_id: &str,
        secret_string: &SecretString,
        stages: &[VersionStage],
    ) -> Result<()>;

    /// Atomically move `stage` onto `move_to_version`, taking it off
    /// `remove_from_version`.
    async fn update_version_stage(
        &self,
        secret_id: &str,
        stage: &VersionStage,
        move_to_version: &str,
        remove_from_version: Option<&str>,
    ) -> Result<()>;
}
