//! Staging metadata and redacting value types for the secret store.
//!
//! A secret in the store has many versions. Each version carries zero or more
//! stage labels; the rotation protocol only cares about three of them
//! (`AWSCURRENT`, `AWSPENDING`, `AWSPREVIOUS`), and at most one version holds
//! any given label at a time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string wrapper that redacts its contents in Debug, Display, and serialization.
///
/// Used for passwords and auth tokens. Memory is zeroed on drop. The raw
/// value is only reachable through [`SecretString::expose_secret`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying value. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Stage label attached to a secret version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionStage {
    /// `AWSCURRENT` - the version clients use
    Current,
    /// `AWSPENDING` - the candidate of an in-flight rotation
    Pending,
    /// `AWSPREVIOUS` - the last demoted current version
    Previous,
    /// Any custom label
    Custom(String),
}

impl VersionStage {
    pub const CURRENT_LABEL: &'static str = "AWSCURRENT";
    pub const PENDING_LABEL: &'static str = "AWSPENDING";
    pub const PREVIOUS_LABEL: &'static str = "AWSPREVIOUS";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Current => Self::CURRENT_LABEL,
            Self::Pending => Self::PENDING_LABEL,
            Self::Previous => Self::PREVIOUS_LABEL,
            Self::Custom(label) => label,
        }
    }
}

impl FromStr for VersionStage {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            Self::CURRENT_LABEL => Self::Current,
            Self::PENDING_LABEL => Self::Pending,
            Self::PREVIOUS_LABEL => Self::Previous,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl fmt::Display for VersionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a rotation attempt's version, derived from its stage labels.
///
/// `Current` wins over `Pending` when a version carries both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
    Current,
    Pending,
    Other,
}

/// Result of `describeSecret`: the rotation flag and the version map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretDescription {
    /// `None` when the store omits the flag; only an explicit `false` disables rotation.
    pub rotation_enabled: Option<bool>,
    pub version_ids_to_stages: HashMap<String, Vec<String>>,
}

impl SecretDescription {
    pub fn new(rotation_enabled: Option<bool>) -> Self {
        Self { rotation_enabled, version_ids_to_stages: HashMap::new() }
    }

    pub fn with_version<I, S>(mut self, version_id: impl Into<String>, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.version_ids_to_stages
            .insert(version_id.into(), stages.into_iter().map(Into::into).collect());
        self
    }

    pub fn rotation_disabled(&self) -> bool {
        self.rotation_enabled == Some(false)
    }

    pub fn has_version(&self, version_id: &str) -> bool {
        self.version_ids_to_stages.contains_key(version_id)
    }

    pub fn version_has_stage(&self, version_id: &str, stage: &VersionStage) -> bool {
        self.version_ids_to_stages
            .get(version_id)
            .is_some_and(|stages| stages.iter().any(|s| s == stage.as_str()))
    }

    /// Stage role of `version_id`, or `None` when the version is unknown.
    pub fn attempt_stage(&self, version_id: &str) -> Option<AttemptStage> {
        if !self.has_version(version_id) {
            return None;
        }
        if self.version_has_stage(version_id, &VersionStage::Current) {
            Some(AttemptStage::Current)
        } else if self.version_has_stage(version_id, &VersionStage::Pending) {
            Some(AttemptStage::Pending)
        } else {
            Some(AttemptStage::Other)
        }
    }

    /// The version currently holding `AWSCURRENT`, if any.
    pub fn current_version(&self) -> Option<&str> {
        self.version_ids_to_stages
            .iter()
            .find(|(_, stages)| stages.iter().any(|s| s == VersionStage::CURRENT_LABEL))
            .map(|(version, _)| version.as_str())
    }
}
