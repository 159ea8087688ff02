//! # Database Authentication
//!
//! Auth-token generation for the cluster: [`AuthTokenGenerator`] picks the
//! signing path from the principal name and delegates to a [`TokenSigner`].
//! [`DsqlTokenSigner`] is the production signer.

pub mod dsql_signer;
pub mod token_generator;

pub use dsql_signer::DsqlTokenSigner;
pub use token_generator::{
    AuthTokenGenerator, TokenRequest, TokenScope, TokenSigner, ADMIN_USERNAME, LOGIN_TOKEN_EXPIRY,
    ROTATION_TOKEN_EXPIRY,
};
