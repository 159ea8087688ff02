//! Short-lived auth tokens used as database passwords.
//!
//! A token is a pre-signed, time-bounded credential scoped to a cluster host,
//! a region and a principal. The administrative principal and every other
//! principal are signed through different paths: an admin token can never be
//! produced for a non-admin user, and vice versa.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use crate::errors::{Result, RotationError};
use crate::secrets::SecretString;

/// The administrative principal, compared after trimming and lowercasing.
pub const ADMIN_USERNAME: &str = "admin";

/// Expiry for tokens used to log in right away.
pub const LOGIN_TOKEN_EXPIRY: Duration = Duration::from_secs(900);

/// Expiry for tokens minted during createSecret; covers the rest of the rotation cycle.
pub const ROTATION_TOKEN_EXPIRY: Duration = Duration::from_secs(28_800);

/// Which signing path a token request takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    Admin,
    Standard,
}

impl TokenScope {
    /// Pick the scope for `username`.
    ///
    /// # Errors
    ///
    /// [`RotationError::Validation`] if the username is empty after trimming.
    pub fn for_username(username: &str) -> Result<Self> {
        let normalized = username.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(RotationError::validation("Username cannot be empty"));
        }
        Ok(if normalized == ADMIN_USERNAME { Self::Admin } else { Self::Standard })
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Standard => f.write_str("standard"),
        }
    }
}

/// Everything the signer needs for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub host: String,
    pub region: String,
    pub scope: TokenScope,
    pub expires_in: Duration,
}

/// Signs token requests. Implementations hold no per-invocation state.
#[async_trait]
pub trait TokenSigner: Send + Sync {
    /// # Errors
    ///
    /// [`RotationError::TokenGeneration`] when signing fails.
    async fn sign(&self, request: &TokenRequest) -> Result<SecretString>;
}

/// Produces a fresh token on every call; nothing is cached.
#[derive(Clone)]
pub struct AuthTokenGenerator {
    signer: Arc<dyn TokenSigner>,
    region: String,
}

impl AuthTokenGenerator {
    pub fn new(signer: Arc<dyn TokenSigner>, region: impl Into<String>) -> Self {
        Self { signer, region: region.into() }
    }

    /// Generate a token for `username` on `host`, valid for `expires_in`.
    ///
    /// # Errors
    ///
    /// - [`RotationError::Validation`] if `username` is blank
    /// - [`RotationError::TokenGeneration`] if the signer fails
    #[instrument(skip(self), fields(region = %self.region))]
    pub async fn generate_auth_token(
        &self,
        host: &str,
        username: &str,
        expires_in: Duration,
    ) -> Result<SecretString> {
        let scope = TokenScope::for_username(username)?;
        let request = TokenRequest {
            host: host.to_string(),
            region: self.region.clone(),
            scope,
            expires_in,
        };

        let token = self.signer.sign(&request).await?;
        info!(
            host = %host,
            scope = %scope,
            expires_in_secs = expires_in.as_secs(),
            "Generated auth token"
        );
        Ok(token)
    }
}

impl fmt::Debug for AuthTokenGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokenGenerator")
            .field("region", &self.region)
            .field("signer", &"[TokenSigner]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSigner {
        requests: Mutex<Vec<TokenRequest>>,
    }

    #[async_trait]
    impl TokenSigner for RecordingSigner {
        async fn sign(&self, request: &TokenRequest) -> Result<SecretString> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            Ok(SecretString::new(format!("{}-token-{}", request.scope, requests.len())))
        }
    }

    fn generator() -> (AuthTokenGenerator, Arc<RecordingSigner>) {
        let signer = Arc::new(RecordingSigner::default());
        (AuthTokenGenerator::new(signer.clone(), "us-east-1"), signer)
    }

    #[tokio::test]
    async fn test_admin_usernames_take_admin_path() {
        let (generator, signer) = generator();
        for username in ["admin", "Admin", "  ADMIN "] {
            generator.generate_auth_token("db.example", username, LOGIN_TOKEN_EXPIRY).await.unwrap();
        }

        let requests = signer.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.scope == TokenScope::Admin));
    }

    #[tokio::test]
    async fn test_other_usernames_take_standard_path() {
        let (generator, signer) = generator();
        let token = generator
            .generate_auth_token("db.example", "app_user", ROTATION_TOKEN_EXPIRY)
            .await
            .unwrap();
        assert_eq!(token.expose_secret(), "standard-token-1");

        let requests = signer.requests.lock().unwrap();
        assert_eq!(
            requests[0],
            TokenRequest {
                host: "db.example".to_string(),
                region: "us-east-1".to_string(),
                scope: TokenScope::Standard,
                expires_in: Duration::from_secs(28_800),
            }
        );
    }

    #[tokio::test]
    async fn test_blank_username_never_reaches_signer() {
        let (generator, signer) = generator();
        for username in ["", "   "] {
            let err = generator
                .generate_auth_token("db.example", username, LOGIN_TOKEN_EXPIRY)
                .await
                .unwrap_err();
            assert!(matches!(err, RotationError::Validation { .. }));
        }
        assert!(signer.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_every_call_signs_fresh_token() {
        let (generator, signer) = generator();
        let first = generator.generate_auth_token("h", "app", LOGIN_TOKEN_EXPIRY).await.unwrap();
        let second = generator.generate_auth_token("h", "app", LOGIN_TOKEN_EXPIRY).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(signer.requests.lock().unwrap().len(), 2);
    }

    proptest! {
        #[test]
        fn prop_any_casing_of_admin_is_admin(mask in prop::collection::vec(any::<bool>(), 5)) {
            let username: String = ADMIN_USERNAME
                .chars()
                .zip(mask)
                .map(|(c, upper)| if upper { c.to_ascii_uppercase() } else { c })
                .collect();
            prop_assert_eq!(TokenScope::for_username(&username).unwrap(), TokenScope::Admin);
        }

        #[test]
        fn prop_non_admin_names_are_standard(name in "[a-z_][a-z0-9_]{0,15}") {
            prop_assume!(name != ADMIN_USERNAME);
            prop_assert_eq!(TokenScope::for_username(&name).unwrap(), TokenScope::Standard);
        }
    }
}
