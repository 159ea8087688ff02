use thiserror::Error;

use crate::storage::TlsTier;

/// Why a single TLS tier could not open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierFailure {
    pub tier: TlsTier,
    pub message: String,
}

impl TierFailure {
    pub fn new(tier: TlsTier, message: impl Into<String>) -> Self {
        Self { tier, message: message.into() }
    }
}

/// Both TLS tiers were tried and both failed.
///
/// Carries the failure of each tier so that the degraded-tier error is not
/// lost behind the strict one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "Unable to connect to {endpoint}: {} failed ({}); {} failed ({})",
    strict.tier, strict.message, degraded.tier, degraded.message
)]
pub struct ConnectionFailure {
    pub endpoint: String,
    pub strict: TierFailure,
    pub degraded: TierFailure,
}
