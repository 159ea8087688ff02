//! Secret store abstraction for the rotation protocol.
//!
//! The rotation handler never talks to AWS Secrets Manager directly. It is
//! written against [`SecretVersionStore`], which exposes the four staging
//! operations the protocol needs:
//! - **describe_secret**: rotation flag and version-to-stages map
//! - **get_secret_value**: read the version holding a stage
//! - **put_secret_value**: create a new immutable version
//! - **update_version_stage**: atomically move a stage label
//!
//! # Backends
//!
//! - **AWS Secrets Manager**: [`AwsSecretsManagerStore`], used in production
//! - **In-memory**: [`InMemorySecretStore`], for tests and local runs
//!
//! # Example
//!
//! ```rust,ignore
//! use dsql_rotation::secrets::{InMemorySecretStore, SecretVersionStore, VersionStage};
//!
//! let store = InMemorySecretStore::new();
//! store.create_secret("app-db", Some(true)).await;
//! store.insert_version("app-db", "v1", r#"{"username":"app"}"#, &[VersionStage::Current]).await;
//!
//! let description = store.describe_secret("app-db").await?;
//! assert_eq!(description.current_version(), Some("v1"));
//! ```
//!
//! # Security Considerations
//!
//! - Secret strings are carried as [`SecretString`] and never logged
//! - Encryption at rest is the store's responsibility

pub mod aws;
pub mod client;
pub mod error;
pub mod memory;
pub mod types;

pub use aws::AwsSecretsManagerStore;
pub use client::SecretVersionStore;
pub use error::{Result, SecretsError};
pub use memory::InMemorySecretStore;
pub use types::{AttemptStage, SecretDescription, SecretString, VersionStage};
