//! # DSQL Rotation
//!
//! Secret-rotation handler for Aurora DSQL credentials kept in AWS Secrets
//! Manager. Instead of static passwords, each rotation cycle stages a freshly
//! signed IAM auth token as the new password, proves it can log in, and then
//! promotes it.
//!
//! ## Architecture
//!
//! ```text
//! scheduler event → RotationCoordinator → SecretVersionStore (Secrets Manager)
//!                        ↓          ↓
//!         AuthTokenGenerator    ConnectionValidator → CertificateProvider
//!                                       ↓
//!                               DatabaseConnector (sqlx / PostgreSQL wire)
//! ```
//!
//! ## Core Components
//!
//! - **Rotation protocol**: [`services::RotationCoordinator`] runs `createSecret`,
//!   `setSecret`, `testSecret` and `finishSecret` against the version-staging API
//! - **Token generation**: [`auth::AuthTokenGenerator`] picks the admin or
//!   standard signing path from the principal name
//! - **Connection validation**: [`services::ConnectionValidator`] logs in with
//!   verified TLS and falls back to encrypted-only TLS
//!
//! Every external collaborator sits behind a trait so the protocol can run
//! against in-memory fakes.

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod secrets;
pub mod services;
pub mod storage;

pub use config::RotationConfig;
pub use domain::{RotationEvent, RotationStep, SecretDocument};
pub use errors::{Result, RotationError};
pub use observability::init_tracing;
pub use services::{ConnectionValidator, RotationCoordinator};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
