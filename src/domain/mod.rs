//! Domain layer
//!
//! Pure types of the rotation protocol with no I/O: the secret document and
//! its validation rules, and the scheduler's invocation payload.

pub mod rotation;
pub mod secret_document;

pub use rotation::{RotationEvent, RotationStep};
pub use secret_document::{SecretDocument, DEFAULT_DBNAME, DEFAULT_PORT, SUPPORTED_ENGINE};
