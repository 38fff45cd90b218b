//! Shared utilities

pub mod config;
pub mod diagnostic;
pub mod hash;

pub use config::{load_config, Config};
pub use diagnostic::Diagnostic;
pub use hash::Fingerprint;
