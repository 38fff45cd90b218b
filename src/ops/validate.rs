//! Validating a variant against everything providers know about.
//!
//! Unlike ranking, validation is meant for package builders: the capability
//! sets passed here should list every value a provider recognises, not only
//! the ones usable on this machine.

use std::fmt;

use indexmap::IndexMap;

use crate::core::provider::{ProviderCapabilitySet, Support};
use crate::core::property::VariantProperty;
use crate::core::variant::Variant;

/// Verdict for a single property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyValidation {
    /// The owning provider recognises the feature and value.
    Valid,
    /// The owning provider does not recognise the feature or value.
    Invalid,
    /// No provider owns the namespace, so the property cannot be checked.
    Unknown,
}

impl fmt::Display for PropertyValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PropertyValidation::Valid => "valid",
            PropertyValidation::Invalid => "invalid",
            PropertyValidation::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Per-property validation results, in canonical property order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    results: IndexMap<VariantProperty, PropertyValidation>,
}

impl ValidationReport {
    /// True when no property is invalid. Unknown properties count as valid
    /// only when `allow_unknown` is set.
    pub fn is_valid(&self, allow_unknown: bool) -> bool {
        self.results.values().all(|v| match v {
            PropertyValidation::Valid => true,
            PropertyValidation::Invalid => false,
            PropertyValidation::Unknown => allow_unknown,
        })
    }

    pub fn get(&self, property: &VariantProperty) -> Option<PropertyValidation> {
        self.results.get(property).copied()
    }

    pub fn results(&self) -> &IndexMap<VariantProperty, PropertyValidation> {
        &self.results
    }

    pub fn invalid_properties(&self) -> Vec<&VariantProperty> {
        self.filter(PropertyValidation::Invalid)
    }

    pub fn unknown_properties(&self) -> Vec<&VariantProperty> {
        self.filter(PropertyValidation::Unknown)
    }

    fn filter(&self, wanted: PropertyValidation) -> Vec<&VariantProperty> {
        self.results
            .iter()
            .filter(|(_, v)| **v == wanted)
            .map(|(p, _)| p)
            .collect()
    }
}

/// Check every property of `variant` against the given capability sets.
pub fn validate_variant(variant: &Variant, providers: &[ProviderCapabilitySet]) -> ValidationReport {
    let results = variant
        .properties()
        .iter()
        .map(|prop| {
            let verdict = match providers.iter().find(|p| p.namespace() == prop.namespace) {
                None => PropertyValidation::Unknown,
                Some(provider) => match provider.check(prop) {
                    Support::Supported => PropertyValidation::Valid,
                    _ => PropertyValidation::Invalid,
                },
            };
            (prop.clone(), verdict)
        })
        .collect();

    ValidationReport { results }
}
