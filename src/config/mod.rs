//! # Configuration Management
//!
//! Environment-driven configuration for the rotation handler. Values are
//! read once at process start (after an optional `.env` file is loaded) and
//! validated with the `validator` crate.

pub mod settings;

pub use settings::{ObservabilityConfig, RotationConfig};
