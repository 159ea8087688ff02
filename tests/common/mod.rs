//! Common test utilities for all integration tests.
//!
//! Fakes for every external collaborator of the rotation handler, plus
//! builders that wire them into a coordinator.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dsql_rotation::auth::{AuthTokenGenerator, TokenRequest, TokenSigner};
use dsql_rotation::errors::{Result, RotationError};
use dsql_rotation::secrets::{
    self, InMemorySecretStore, SecretDescription, SecretString, SecretVersionStore, SecretsError,
    VersionStage,
};
use dsql_rotation::storage::{
    CertificateProvider, ConnectionTarget, DatabaseConnector, DatabaseSession, TlsPolicy, TlsTier,
    TrustAnchor,
};
use dsql_rotation::{ConnectionValidator, RotationCoordinator};

pub const SECRET_ID: &str = "arn:aws:secretsmanager:us-east-1:123456789012:secret:app-db";
pub const REGION: &str = "us-east-1";
pub const CURRENT_VERSION: &str = "00000000-0000-4000-8000-000000000001";
pub const ATTEMPT_TOKEN: &str = "00000000-0000-4000-8000-000000000002";

pub fn current_document(username: &str) -> String {
    serde_json::json!({
        "username": username,
        "password": "static-password",
        "host": "cluster.dsql.us-east-1.on.aws",
        "engine": "postgres",
        "port": 5432,
        "dbname": "postgres",
        "dbClusterIdentifier": "abc123"
    })
    .to_string()
}

/// Secret with a current version and the attempt token staged pending.
pub async fn seeded_store(username: &str) -> InMemorySecretStore {
    let store = InMemorySecretStore::new();
    store.create_secret(SECRET_ID, Some(true)).await;
    store
        .insert_version(
            SECRET_ID,
            CURRENT_VERSION,
            current_document(username),
            &[VersionStage::Current],
        )
        .await;
    store.begin_rotation(SECRET_ID, ATTEMPT_TOKEN).await;
    store
}

// ---------------------------------------------------------------------------
// Secret store faults
// ---------------------------------------------------------------------------

pub enum StoreFault {
    /// Every read of the pending stage fails with this error.
    PendingRead(fn() -> SecretsError),
    /// Another attempt writes `winner` under the same version just before
    /// each put lands.
    LostPutRace { winner: String },
}

/// Wraps the in-memory store and injects one [`StoreFault`].
pub struct FaultyStore {
    inner: InMemorySecretStore,
    fault: StoreFault,
}

impl FaultyStore {
    pub fn new(inner: InMemorySecretStore, fault: StoreFault) -> Self {
        Self { inner, fault }
    }
}

#[async_trait]
impl SecretVersionStore for FaultyStore {
    async fn describe_secret(&self, secret_id: &str) -> secrets::Result<SecretDescription> {
        self.inner.describe_secret(secret_id).await
    }

    async fn get_secret_value(
        &self,
        secret_id: &str,
        stage: &VersionStage,
        version_id: Option<&str>,
    ) -> secrets::Result<SecretString> {
        if let (StoreFault::PendingRead(error), VersionStage::Pending) = (&self.fault, stage) {
            return Err(error());
        }
        self.inner.get_secret_value(secret_id, stage, version_id).await
    }

    async fn put_secret_value(
        &self,
        secret_id: &str,
        version_id: &str,
        secret_string: &SecretString,
        stages: &[VersionStage],
    ) -> secrets::Result<()> {
        if let StoreFault::LostPutRace { winner } = &self.fault {
            self.inner
                .put_secret_value(secret_id, version_id, &SecretString::new(winner.clone()), stages)
                .await?;
        }
        self.inner.put_secret_value(secret_id, version_id, secret_string, stages).await
    }

    async fn update_version_stage(
        &self,
        secret_id: &str,
        stage: &VersionStage,
        move_to_version: &str,
        remove_from_version: Option<&str>,
    ) -> secrets::Result<()> {
        self.inner.update_version_stage(secret_id, stage, move_to_version, remove_from_version).await
    }
}

// ---------------------------------------------------------------------------
// Token signer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSigner {
    requests: Mutex<Vec<TokenRequest>>,
    fail: bool,
}

impl RecordingSigner {
    pub fn failing() -> Self {
        Self { requests: Mutex::new(Vec::new()), fail: true }
    }

    pub fn requests(&self) -> Vec<TokenRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenSigner for RecordingSigner {
    async fn sign(&self, request: &TokenRequest) -> Result<SecretString> {
        if self.fail {
            return Err(RotationError::token_generation("signer unavailable"));
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(SecretString::new(format!(
            "{}?Action=DbConnect&X-Amz-Expires={}&n={}",
            request.host,
            request.expires_in.as_secs(),
            requests.len()
        )))
    }
}

// ---------------------------------------------------------------------------
// Certificate provider
// ---------------------------------------------------------------------------

/// Writes a real temporary PEM file per fetch and remembers its path.
#[derive(Default)]
pub struct FakeCertificateProvider {
    fetched: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl FakeCertificateProvider {
    pub fn failing() -> Self {
        Self { fetched: Mutex::new(Vec::new()), fail: true }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    /// Paths handed out that still exist on disk.
    pub fn leaked_paths(&self) -> Vec<PathBuf> {
        self.fetched.lock().unwrap().iter().filter(|p| p.exists()).cloned().collect()
    }
}

#[async_trait]
impl CertificateProvider for FakeCertificateProvider {
    async fn fetch(&self) -> Result<TrustAnchor> {
        if self.fail {
            return Err(RotationError::certificate("download timed out"));
        }
        let mut file = tempfile::Builder::new()
            .prefix("test-root-ca-")
            .suffix(".pem")
            .tempfile()
            .map_err(|e| RotationError::certificate(e.to_string()))?;
        std::io::Write::write_all(&mut file, b"-----BEGIN CERTIFICATE-----\n")
            .map_err(|e| RotationError::certificate(e.to_string()))?;

        let path = file.into_temp_path();
        self.fetched.lock().unwrap().push(path.to_path_buf());
        Ok(TrustAnchor::from_temp_path(path))
    }
}

// ---------------------------------------------------------------------------
// Database connector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Outcome {
    Accept,
    Reject(&'static str),
}

#[derive(Debug, Clone)]
pub struct ConnectAttempt {
    pub tier: TlsTier,
    pub target: ConnectionTarget,
    /// For strict attempts: whether the root certificate file existed at connect time.
    pub root_cert_present: Option<bool>,
}

/// Connector whose answer per TLS tier is scripted up front.
pub struct ScriptedConnector {
    strict: Outcome,
    degraded: Outcome,
    liveness: Outcome,
    attempts: Mutex<Vec<ConnectAttempt>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new(strict: Outcome, degraded: Outcome) -> Self {
        Self {
            strict,
            degraded,
            liveness: Outcome::Accept,
            attempts: Mutex::new(Vec::new()),
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn accepting() -> Self {
        Self::new(Outcome::Accept, Outcome::Accept)
    }

    pub fn with_liveness(mut self, liveness: Outcome) -> Self {
        self.liveness = liveness;
        self
    }

    pub fn attempts(&self) -> Vec<ConnectAttempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn tiers_tried(&self) -> Vec<TlsTier> {
        self.attempts().iter().map(|a| a.tier).collect()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseConnector for ScriptedConnector {
    async fn connect(
        &self,
        target: &ConnectionTarget,
        policy: TlsPolicy<'_>,
    ) -> std::result::Result<Box<dyn DatabaseSession>, sqlx::Error> {
        let root_cert_present = match policy {
            TlsPolicy::VerifyFull { root_cert } => Some(root_cert.exists()),
            TlsPolicy::Require => None,
        };
        self.attempts.lock().unwrap().push(ConnectAttempt {
            tier: policy.tier(),
            target: target.clone(),
            root_cert_present,
        });

        let outcome = match policy.tier() {
            TlsTier::Strict => &self.strict,
            TlsTier::Degraded => &self.degraded,
        };
        match outcome {
            Outcome::Accept => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FakeSession {
                    liveness: self.liveness.clone(),
                    closed: self.closed.clone(),
                }))
            }
            Outcome::Reject(reason) => Err(sqlx::Error::Protocol(reason.to_string())),
        }
    }
}

struct FakeSession {
    liveness: Outcome,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl DatabaseSession for FakeSession {
    async fn check_liveness(&mut self) -> std::result::Result<(), sqlx::Error> {
        match &self.liveness {
            Outcome::Accept => Ok(()),
            Outcome::Reject(reason) => Err(sqlx::Error::Protocol(reason.to_string())),
        }
    }

    async fn close(self: Box<Self>) -> std::result::Result<(), sqlx::Error> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: InMemorySecretStore,
    pub signer: Arc<RecordingSigner>,
    pub certificates: Arc<FakeCertificateProvider>,
    pub connector: Arc<ScriptedConnector>,
    pub coordinator: RotationCoordinator,
}

impl Harness {
    pub fn new(store: InMemorySecretStore, connector: ScriptedConnector) -> Self {
        Self::with_parts(
            store,
            RecordingSigner::default(),
            FakeCertificateProvider::default(),
            connector,
        )
    }

    pub fn with_parts(
        store: InMemorySecretStore,
        signer: RecordingSigner,
        certificates: FakeCertificateProvider,
        connector: ScriptedConnector,
    ) -> Self {
        let backend = Arc::new(store.clone());
        Self::build(store, backend, signer, certificates, connector)
    }

    /// Coordinator reads and writes through a [`FaultyStore`] over `store`.
    pub fn with_fault(store: InMemorySecretStore, fault: StoreFault) -> Self {
        let backend = Arc::new(FaultyStore::new(store.clone(), fault));
        Self::build(
            store,
            backend,
            RecordingSigner::default(),
            FakeCertificateProvider::default(),
            ScriptedConnector::accepting(),
        )
    }

    fn build(
        store: InMemorySecretStore,
        backend: Arc<dyn SecretVersionStore>,
        signer: RecordingSigner,
        certificates: FakeCertificateProvider,
        connector: ScriptedConnector,
    ) -> Self {
        let signer = Arc::new(signer);
        let certificates = Arc::new(certificates);
        let connector = Arc::new(connector);

        let validator = ConnectionValidator::new(certificates.clone(), connector.clone());
        let tokens = AuthTokenGenerator::new(signer.clone(), REGION);
        let coordinator = RotationCoordinator::new(backend, tokens, validator);

        Self { store, signer, certificates, connector, coordinator }
    }
}

pub fn validator(
    certificates: Arc<FakeCertificateProvider>,
    connector: Arc<ScriptedConnector>,
) -> ConnectionValidator {
    ConnectionValidator::new(certificates, connector)
}
