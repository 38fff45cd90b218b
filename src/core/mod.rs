//! Core data model for variant resolution.
//!
//! This module contains the value types everything else is built from:
//! - Interned namespace and feature names
//! - Properties, features and variants with their identifiers
//! - Provider capability sets and the provider seam
//! - Environment markers for conditional providers

pub mod marker;
pub mod name;
pub mod property;
pub mod provider;
pub mod variant;

pub use marker::{Environment, Marker};
pub use name::{Name, NameKind};
pub use property::{VariantFeature, VariantProperty};
pub use provider::{
    query_capabilities, CapabilityProvider, FeatureCapability, ProviderCapabilitySet,
    ProviderInfo, ProviderResponse, StaticProvider, Support,
};
pub use variant::{Variant, VariantHash};
