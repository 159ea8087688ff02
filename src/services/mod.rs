//! Rotation services
//!
//! The coordinator that runs the rotation phases and the validator that
//! proves a credential can log in.

pub mod connection_validator;
pub mod rotation_service;

pub use connection_validator::{ConnectionValidator, ValidatedSession};
pub use rotation_service::RotationCoordinator;
