//! Rotation invocation payload and phases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four rotation phases, in the order the scheduler invokes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationStep {
    CreateSecret,
    SetSecret,
    TestSecret,
    FinishSecret,
}

impl RotationStep {
    pub const ALL: [RotationStep; 4] =
        [Self::CreateSecret, Self::SetSecret, Self::TestSecret, Self::FinishSecret];

    /// Wire name used by the scheduler.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateSecret => "createSecret",
            Self::SetSecret => "setSecret",
            Self::TestSecret => "testSecret",
            Self::FinishSecret => "finishSecret",
        }
    }
}

impl FromStr for RotationStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createSecret" => Ok(Self::CreateSecret),
            "setSecret" => Ok(Self::SetSecret),
            "testSecret" => Ok(Self::TestSecret),
            "finishSecret" => Ok(Self::FinishSecret),
            _ => Err(format!("Unknown rotation step: {}", s)),
        }
    }
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered by the scheduler for every phase.
///
/// `step` is kept as the raw string so that an unknown value is reported
/// after the staging preconditions, not as a payload decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationEvent {
    #[serde(rename = "SecretId")]
    pub secret_id: String,
    #[serde(rename = "ClientRequestToken")]
    pub client_request_token: String,
    #[serde(rename = "Step")]
    pub step: String,
}

impl RotationEvent {
    pub fn new(
        secret_id: impl Into<String>,
        client_request_token: impl Into<String>,
        step: RotationStep,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            client_request_token: client_request_token.into(),
            step: step.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_wire_names() {
        for step in RotationStep::ALL {
            assert_eq!(step.as_str().parse::<RotationStep>().unwrap(), step);
        }
        assert!("CreateSecret".parse::<RotationStep>().is_err());
    }

    #[test]
    fn test_event_deserializes_scheduler_payload() {
        let payload = r#"{
            "SecretId": "arn:aws:secretsmanager:us-east-1:123456789012:secret:app-db",
            "ClientRequestToken": "3a5c8d1e-0000-4000-8000-000000000001",
            "Step": "testSecret"
        }"#;

        let event: RotationEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.step, "testSecret");
        assert_eq!(event.client_request_token, "3a5c8d1e-0000-4000-8000-000000000001");
        assert_eq!(
            event,
            RotationEvent::new(
                "arn:aws:secretsmanager:us-east-1:123456789012:secret:app-db",
                "3a5c8d1e-0000-4000-8000-000000000001",
                RotationStep::TestSecret
            )
        );
    }
}
