//! Trust-anchor acquisition for strict TLS verification.
//!
//! The root certificate is downloaded on every connection attempt into a
//! private temporary file. The file is owned by a [`TrustAnchor`] and removed
//! when the anchor is released or dropped, whichever happens first.

use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::TempPath;
use tracing::debug;
use url::Url;

use crate::errors::{Result, RotationError};

/// Public location of the Amazon root CA used by DSQL endpoints.
pub const DEFAULT_ROOT_CERT_URL: &str = "https://www.amazontrust.com/repository/AmazonRootCA1.pem";

/// Default bound on the certificate download.
pub const DEFAULT_CERT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A locally readable PEM trust anchor, exclusively owned by one connection attempt.
#[derive(Debug)]
pub struct TrustAnchor {
    path: TempPath,
}

impl TrustAnchor {
    pub fn from_temp_path(path: TempPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the backing file now, surfacing any I/O error.
    pub fn release(self) -> std::io::Result<()> {
        self.path.close()
    }
}

/// Supplies the trust anchor for the strict TLS tier.
#[async_trait]
pub trait CertificateProvider: Send + Sync {
    /// Acquire a fresh trust anchor.
    ///
    /// # Errors
    ///
    /// [`RotationError::Certificate`] on any download or write failure.
    async fn fetch(&self) -> Result<TrustAnchor>;
}

/// Downloads the trust anchor over HTTPS with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpCertificateProvider {
    client: reqwest::Client,
    url: Url,
}

impl HttpCertificateProvider {
    /// # Errors
    ///
    /// [`RotationError::Configuration`] if `url` is not an http(s) URL or the
    /// client cannot be built.
    pub fn new(url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url.as_ref()).map_err(|e| {
            RotationError::configuration(format!(
                "Invalid root certificate URL '{}': {}",
                url.as_ref(),
                e
            ))
        })?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(RotationError::configuration(format!(
                "Unsupported root certificate URL scheme: {}",
                url.scheme()
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            RotationError::configuration(format!("Failed to build certificate HTTP client: {}", e))
        })?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl CertificateProvider for HttpCertificateProvider {
    async fn fetch(&self) -> Result<TrustAnchor> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                RotationError::certificate(format!(
                    "Failed to download root certificate from {}: {}",
                    self.url, e
                ))
            })?;

        let body = response.bytes().await.map_err(|e| {
            RotationError::certificate(format!("Failed to read root certificate body: {}", e))
        })?;
        if body.is_empty() {
            return Err(RotationError::certificate(format!(
                "Root certificate download from {} returned an empty body",
                self.url
            )));
        }

        let write_err = |e: std::io::Error| {
            RotationError::certificate(format!("Failed to stage root certificate: {}", e))
        };
        let mut file = tempfile::Builder::new()
            .prefix("dsql-root-ca-")
            .suffix(".pem")
            .tempfile()
            .map_err(write_err)?;
        file.write_all(&body).map_err(write_err)?;
        file.flush().map_err(write_err)?;

        let anchor = TrustAnchor::from_temp_path(file.into_temp_path());
        debug!(path = %anchor.path().display(), bytes = body.len(), "Staged root certificate");
        Ok(anchor)
    }
}
