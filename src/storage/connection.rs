//! # Database Sessions
//!
//! Opens single PostgreSQL-wire sessions against a DSQL cluster under one of
//! two TLS policies, and runs the liveness probe on them.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::Connection;
use std::fmt;
use std::path::Path;

use crate::secrets::SecretString;

/// Query used to prove a session is usable.
pub const LIVENESS_QUERY: &str = "SELECT CURRENT_TIMESTAMP";

/// Verification level a session was established with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlsTier {
    /// Full chain and hostname verification (`sslmode=verify-full`)
    Strict,
    /// Encrypted, certificate not verified (`sslmode=require`)
    Degraded,
}

impl TlsTier {
    pub fn ssl_mode(&self) -> &'static str {
        match self {
            Self::Strict => "verify-full",
            Self::Degraded => "require",
        }
    }
}

impl fmt::Display for TlsTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ssl_mode())
    }
}

/// TLS settings for one connection attempt.
#[derive(Debug, Clone, Copy)]
pub enum TlsPolicy<'a> {
    VerifyFull { root_cert: &'a Path },
    Require,
}

impl TlsPolicy<'_> {
    pub fn tier(&self) -> TlsTier {
        match self {
            Self::VerifyFull { .. } => TlsTier::Strict,
            Self::Require => TlsTier::Degraded,
        }
    }
}

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub username: String,
    pub password: SecretString,
}

impl ConnectionTarget {
    /// Credential-free description for logs and errors.
    pub fn describe(&self) -> String {
        format!("postgres://{}@{}:{}/{}", self.username, self.host, self.port, self.dbname)
    }
}

/// An open database session.
#[async_trait]
pub trait DatabaseSession: Send {
    /// Run [`LIVENESS_QUERY`] in a transaction and commit it.
    async fn check_liveness(&mut self) -> Result<(), sqlx::Error>;

    /// Close the session gracefully.
    async fn close(self: Box<Self>) -> Result<(), sqlx::Error>;
}

/// Opens sessions; the seam between the validator and the wire driver.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    async fn connect(
        &self,
        target: &ConnectionTarget,
        policy: TlsPolicy<'_>,
    ) -> Result<Box<dyn DatabaseSession>, sqlx::Error>;
}

/// sqlx-backed connector.
///
/// Each call opens a fresh `PgConnection`; there is no pool, a rotation step
/// only ever needs one session.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

impl PgConnector {
    pub fn connect_options(target: &ConnectionTarget, policy: TlsPolicy<'_>) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .username(&target.username)
            .password(target.password.expose_secret())
            .database(&target.dbname);

        match policy {
            TlsPolicy::VerifyFull { root_cert } => {
                options.ssl_mode(PgSslMode::VerifyFull).ssl_root_cert(root_cert)
            }
            TlsPolicy::Require => options.ssl_mode(PgSslMode::Require),
        }
    }
}

#[async_trait]
impl DatabaseConnector for PgConnector {
    async fn connect(
        &self,
        target: &ConnectionTarget,
        policy: TlsPolicy<'_>,
    ) -> Result<Box<dyn DatabaseSession>, sqlx::Error> {
        let options = Self::connect_options(target, policy);
        let conn = PgConnection::connect_with(&options).await?;
        Ok(Box::new(PgSession { conn }))
    }
}

struct PgSession {
    conn: PgConnection,
}

#[async_trait]
impl DatabaseSession for PgSession {
    async fn check_liveness(&mut self) -> Result<(), sqlx::Error> {
        let mut tx = self.conn.begin().await?;
        sqlx::query(LIVENESS_QUERY).execute(&mut *tx).await?;
        tx.commit().await
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        self.conn.close().await
    }
}
