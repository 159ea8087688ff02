//! # Connection Validation
//!
//! Proves that a credential can open a session against the cluster.
//!
//! Two TLS tiers are tried in order:
//!
//! 1. `verify-full` against the downloaded root certificate
//! 2. `require` (encrypted, chain not verified), only if tier 1 failed
//!
//! The root certificate is a scoped [`TrustAnchor`]; it is released before
//! [`ConnectionValidator::connect`] returns on every path.

use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::domain::SecretDocument;
use crate::errors::{ConnectionFailure, Result, RotationError, TierFailure};
use crate::storage::{
    CertificateProvider, ConnectionTarget, DatabaseConnector, DatabaseSession, TlsPolicy, TlsTier,
    TrustAnchor,
};

/// An open session and the tier it was established with.
pub struct ValidatedSession {
    pub session: Box<dyn DatabaseSession>,
    pub tier: TlsTier,
}

impl std::fmt::Debug for ValidatedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedSession").field("tier", &self.tier).finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct ConnectionValidator {
    certificates: Arc<dyn CertificateProvider>,
    connector: Arc<dyn DatabaseConnector>,
}

impl ConnectionValidator {
    pub fn new(
        certificates: Arc<dyn CertificateProvider>,
        connector: Arc<dyn DatabaseConnector>,
    ) -> Self {
        Self { certificates, connector }
    }

    /// Open a session for `document`, preferring the strict tier.
    ///
    /// # Errors
    ///
    /// - [`RotationError::Certificate`] if the root certificate cannot be fetched
    /// - [`RotationError::ConnectionFailure`] with both tier causes if neither tier connects
    pub async fn connect(&self, document: &SecretDocument) -> Result<ValidatedSession> {
        let target = document.connection_target();
        let anchor = self.certificates.fetch().await?;

        let outcome = self.connect_with_fallback(&target, &anchor).await;

        if let Err(e) = anchor.release() {
            warn!(error = %e, "Failed to remove temporary root certificate");
        }
        outcome
    }

    async fn connect_with_fallback(
        &self,
        target: &ConnectionTarget,
        anchor: &TrustAnchor,
    ) -> Result<ValidatedSession> {
        let endpoint = target.describe();
        let strict_policy = TlsPolicy::VerifyFull { root_cert: anchor.path() };

        let strict = match self.connector.connect(target, strict_policy).await {
            Ok(session) => {
                info!(endpoint = %endpoint, tier = %TlsTier::Strict, "Connected with certificate verification");
                return Ok(ValidatedSession { session, tier: TlsTier::Strict });
            }
            Err(e) => {
                warn!(
                    endpoint = %endpoint,
                    error = %e,
                    "Verified TLS connection failed, falling back to sslmode=require"
                );
                TierFailure::new(TlsTier::Strict, e.to_string())
            }
        };

        match self.connector.connect(target, TlsPolicy::Require).await {
            Ok(session) => {
                warn!(
                    endpoint = %endpoint,
                    tier = %TlsTier::Degraded,
                    "Connected without certificate verification"
                );
                Ok(ValidatedSession { session, tier: TlsTier::Degraded })
            }
            Err(e) => {
                let failure = ConnectionFailure {
                    endpoint,
                    strict,
                    degraded: TierFailure::new(TlsTier::Degraded, e.to_string()),
                };
                error!(error = %failure, "Both TLS tiers failed");
                Err(failure.into())
            }
        }
    }

    /// Connect, run the liveness query, and close the session.
    ///
    /// Returns the tier the credential was accepted under. The session is
    /// closed whether or not the query succeeds.
    #[instrument(skip(self, document), fields(host = %document.host(), username = %document.username()))]
    pub async fn validate_credential(&self, document: &SecretDocument) -> Result<TlsTier> {
        let ValidatedSession { mut session, tier } = self.connect(document).await?;

        let liveness = session.check_liveness().await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close database session");
        }

        liveness.map_err(|e| {
            RotationError::validation(format!(
                "Liveness query failed on {}: {}",
                document.connection_target().describe(),
                e
            ))
        })?;

        info!(tier = %tier, "Credential accepted");
        Ok(tier)
    }
}

impl std::fmt::Debug for ConnectionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionValidator").finish_non_exhaustive()
    }
}
