//! # Database Connectivity
//!
//! Everything needed to open a TLS session against the cluster: the
//! trust-anchor download and the sqlx connector with its two TLS policies.

pub mod certificate;
pub mod connection;

pub use certificate::{
    CertificateProvider, HttpCertificateProvider, TrustAnchor, DEFAULT_CERT_FETCH_TIMEOUT,
    DEFAULT_ROOT_CERT_URL,
};
pub use connection::{
    ConnectionTarget, DatabaseConnector, DatabaseSession, PgConnector, TlsPolicy, TlsTier,
    LIVENESS_QUERY,
};
