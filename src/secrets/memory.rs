//! In-memory secret store with staging semantics.
//!
//! Mirrors the behaviour of the managed store closely enough to run the full
//! rotation protocol locally:
//!
//! - versions are immutable once put
//! - starting a rotation stages the attempt token `AWSPENDING` with no value
//! - a put for a version that already has a value fails with `AlreadyExists`
//! - a stage label lives on at most one version; attaching it moves it
//! - moving `AWSCURRENT` demotes the old holder to `AWSPREVIOUS`
//!
//! Intended for tests and local development. Nothing is persisted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::client::SecretVersionStore;
use super::error::{Result, SecretsError};
use super::types::{SecretDescription, SecretString, VersionStage};

#[derive(Debug, Clone)]
struct StoredVersion {
    /// `None` for a version staged by [`InMemorySecretStore::begin_rotation`] and not yet put
    secret_string: Option<SecretString>,
    stages: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct StoredSecret {
    rotation_enabled: Option<bool>,
    versions: HashMap<String, StoredVersion>,
}

impl StoredSecret {
    fn holder_of(&self, stage: &str) -> Option<String> {
        self.versions
            .iter()
            .find(|(_, v)| v.stages.iter().any(|s| s == stage))
            .map(|(id, _)| id.clone())
    }

    fn detach(&mut self, stage: &str) {
        for version in self.versions.values_mut() {
            version.stages.retain(|s| s != stage);
        }
    }
}

/// In-memory [`SecretVersionStore`].
///
/// Cheap to clone; clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    secrets: Arc<RwLock<HashMap<String, StoredSecret>>>,
    puts: Arc<AtomicUsize>,
    stage_updates: Arc<AtomicUsize>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret with its rotation flag and no versions.
    pub async fn create_secret(&self, secret_id: &str, rotation_enabled: Option<bool>) {
        let mut secrets = self.secrets.write().await;
        secrets.insert(
            secret_id.to_string(),
            StoredSecret { rotation_enabled, versions: HashMap::new() },
        );
    }

    /// Seed a version directly, bypassing the put bookkeeping.
    pub async fn insert_version(
        &self,
        secret_id: &str,
        version_id: &str,
        secret_string: impl Into<SecretString>,
        stages: &[VersionStage],
    ) {
        let mut secrets = self.secrets.write().await;
        let secret = secrets.entry(secret_id.to_string()).or_default();
        for stage in stages {
            secret.detach(stage.as_str());
        }
        secret.versions.insert(
            version_id.to_string(),
            StoredVersion {
                secret_string: Some(secret_string.into()),
                stages: stages.iter().map(|s| s.as_str().to_string()).collect(),
            },
        );
    }

    /// Stage `token` as `AWSPENDING` without a value, the way the scheduler
    /// opens a rotation cycle.
    pub async fn begin_rotation(&self, secret_id: &str, token: &str) {
        let mut secrets = self.secrets.write().await;
        let secret = secrets.entry(secret_id.to_string()).or_default();
        secret.detach(VersionStage::PENDING_LABEL);
        secret.versions.insert(
            token.to_string(),
            StoredVersion {
                secret_string: None,
                stages: vec![VersionStage::PENDING_LABEL.to_string()],
            },
        );
    }

    /// Number of successful `put_secret_value` calls.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of successful `update_version_stage` calls.
    pub fn stage_update_count(&self) -> usize {
        self.stage_updates.load(Ordering::SeqCst)
    }

    /// Versions currently holding `stage`.
    pub async fn versions_with_stage(&self, secret_id: &str, stage: &VersionStage) -> Vec<String> {
        let secrets = self.secrets.read().await;
        secrets
            .get(secret_id)
            .map(|secret| {
                secret
                    .versions
                    .iter()
                    .filter(|(_, v)| v.stages.iter().any(|s| s == stage.as_str()))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SecretVersionStore for InMemorySecretStore {
    async fn describe_secret(&self, secret_id: &str) -> Result<SecretDescription> {
        let secrets = self.secrets.read().await;
        let secret = secrets.get(secret_id).ok_or_else(|| SecretsError::not_found(secret_id))?;

        Ok(SecretDescription {
            rotation_enabled: secret.rotation_enabled,
            version_ids_to_stages: secret
                .versions
                .iter()
                .filter(|(_, v)| !v.stages.is_empty())
                .map(|(id, v)| (id.clone(), v.stages.clone()))
                .collect(),
        })
    }

    async fn get_secret_value(
        &self,
        secret_id: &str,
        stage: &VersionStage,
        version_id: Option<&str>,
    ) -> Result<SecretString> {
        let secrets = self.secrets.read().await;
        let secret = secrets.get(secret_id).ok_or_else(|| SecretsError::not_found(secret_id))?;

        let holder = secret.holder_of(stage.as_str()).ok_or_else(|| {
            SecretsError::not_found(format!("{} (no version staged {})", secret_id, stage))
        })?;

        if let Some(requested) = version_id {
            if !secret.versions.contains_key(requested) {
                return Err(SecretsError::not_found(format!("{} version {}", secret_id, requested)));
            }
            if requested != holder {
                return Err(SecretsError::not_found(format!(
                    "{} version {} is not staged {}",
                    secret_id, requested, stage
                )));
            }
        }

        secret
            .versions
            .get(&holder)
            .and_then(|v| v.secret_string.clone())
            .ok_or_else(|| {
                SecretsError::not_found(format!("{} version {} has no value", secret_id, holder))
            })
    }

    async fn put_secret_value(
        &self,
        secret_id: &str,
        version_id: &str,
        secret_string: &SecretString,
        stages: &[VersionStage],
    ) -> Result<()> {
        let mut secrets = self.secrets.write().await;
        let secret =
            secrets.get_mut(secret_id).ok_or_else(|| SecretsError::not_found(secret_id))?;

        let mut kept_stages = Vec::new();
        if let Some(existing) = secret.versions.get(version_id) {
            if existing.secret_string.is_some() {
                return Err(SecretsError::already_exists(format!(
                    "{} version {}",
                    secret_id, version_id
                )));
            }
            kept_stages = existing.stages.clone();
        }

        for stage in stages {
            secret.detach(stage.as_str());
        }
        for stage in stages {
            if !kept_stages.iter().any(|s| s == stage.as_str()) {
                kept_stages.push(stage.as_str().to_string());
            }
        }
        secret.versions.insert(
            version_id.to_string(),
            StoredVersion { secret_string: Some(secret_string.clone()), stages: kept_stages },
        );
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_version_stage(
        &self,
        secret_id: &str,
        stage: &VersionStage,
        move_to_version: &str,
        remove_from_version: Option<&str>,
    ) -> Result<()> {
        let mut secrets = self.secrets.write().await;
        let secret =
            secrets.get_mut(secret_id).ok_or_else(|| SecretsError::not_found(secret_id))?;

        if !secret.versions.contains_key(move_to_version) {
            return Err(SecretsError::not_found(format!(
                "{} version {}",
                secret_id, move_to_version
            )));
        }

        let holder = secret.holder_of(stage.as_str());
        match (holder.as_deref(), remove_from_version) {
            (Some(current), Some(expected)) if current != expected => {
                return Err(SecretsError::invalid_value(format!(
                    "stage {} is attached to {}, not {}",
                    stage, current, expected
                )));
            }
            (Some(current), None) if current != move_to_version => {
                return Err(SecretsError::invalid_value(format!(
                    "stage {} is attached to {}; removeFromVersion is required",
                    stage, current
                )));
            }
            _ => {}
        }

        secret.detach(stage.as_str());
        if let Some(version) = secret.versions.get_mut(move_to_version) {
            version.stages.push(stage.as_str().to_string());
        }

        if *stage == VersionStage::Current {
            if let Some(previous) = holder.filter(|h| h != move_to_version) {
                secret.detach(VersionStage::PREVIOUS_LABEL);
                if let Some(version) = secret.versions.get_mut(&previous) {
                    version.stages.push(VersionStage::PREVIOUS_LABEL.to_string());
                }
            }
        }

        self.stage_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
