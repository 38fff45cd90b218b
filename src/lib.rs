//! variantlib - variant resolution and priority engine
//!
//! This crate decides which build variant of a package suits the current
//! environment. Providers declare what the environment supports, a priority
//! policy says what the user prefers, and the resolver filters and ranks the
//! published variants accordingly.

pub mod core;
pub mod errors;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test fixtures for variantlib unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests.
#[cfg(test)]
pub mod test_support;

pub use core::{
    marker::Environment, property::VariantFeature, property::VariantProperty,
    provider::CapabilityProvider, provider::ProviderCapabilitySet, provider::ProviderInfo,
    provider::StaticProvider, variant::Variant, variant::VariantHash,
};

pub use errors::{Result, VariantError};
pub use resolver::{PriorityLists, PriorityPolicy, Resolution, Session};
pub use sources::VariantsJson;
