//! Compatibility filtering of candidate variants.
//!
//! A candidate survives only if every one of its properties is supported by
//! an active provider and none of them is forbidden by the user.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::name::Name;
use crate::core::property::{VariantFeature, VariantProperty};
use crate::core::provider::{ProviderCapabilitySet, Support};
use crate::core::variant::{Variant, VariantHash};
use crate::errors::{Result, VariantError};

/// User-supplied lists of things that must never be selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionLists {
    pub forbidden_namespaces: Vec<String>,
    pub forbidden_features: Vec<String>,
    pub forbidden_properties: Vec<String>,
}

impl ExclusionLists {
    pub fn is_empty(&self) -> bool {
        self.forbidden_namespaces.is_empty()
            && self.forbidden_features.is_empty()
            && self.forbidden_properties.is_empty()
    }
}

/// Parsed exclusion lists.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    namespaces: HashSet<Name>,
    features: HashSet<VariantFeature>,
    properties: HashSet<VariantProperty>,
}

impl Exclusions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(lists: &ExclusionLists) -> Result<Self> {
        let mut exclusions = Exclusions::new();
        for ns in &lists.forbidden_namespaces {
            exclusions.namespaces.insert(Name::namespace(ns.trim())?);
        }
        for feat in &lists.forbidden_features {
            exclusions.features.insert(feat.parse()?);
        }
        for prop in &lists.forbidden_properties {
            exclusions.properties.insert(prop.parse()?);
        }
        Ok(exclusions)
    }

    pub fn forbid_namespace(mut self, namespace: Name) -> Self {
        self.namespaces.insert(namespace);
        self
    }

    pub fn forbid_feature(mut self, feature: VariantFeature) -> Self {
        self.features.insert(feature);
        self
    }

    pub fn forbid_property(mut self, property: VariantProperty) -> Self {
        self.properties.insert(property);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty() && self.features.is_empty() && self.properties.is_empty()
    }

    fn check(&self, property: &VariantProperty) -> Option<ExclusionReason> {
        if self.namespaces.contains(&property.namespace) {
            Some(ExclusionReason::ForbiddenNamespace(property.clone()))
        } else if self.features.contains(&property.feature_key()) {
            Some(ExclusionReason::ForbiddenFeature(property.clone()))
        } else if self.properties.contains(property) {
            Some(ExclusionReason::ForbiddenProperty(property.clone()))
        } else {
            None
        }
    }
}

/// Why a candidate was dropped. Carries the first offending property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// No active provider owns the namespace.
    UnknownNamespace(VariantProperty),
    /// The provider does not declare the feature.
    UnknownFeature(VariantProperty),
    /// The provider does not support the value here.
    UnsupportedValue(VariantProperty),
    ForbiddenNamespace(VariantProperty),
    ForbiddenFeature(VariantProperty),
    ForbiddenProperty(VariantProperty),
}

impl ExclusionReason {
    pub fn property(&self) -> &VariantProperty {
        match self {
            ExclusionReason::UnknownNamespace(p)
            | ExclusionReason::UnknownFeature(p)
            | ExclusionReason::UnsupportedValue(p)
            | ExclusionReason::ForbiddenNamespace(p)
            | ExclusionReason::ForbiddenFeature(p)
            | ExclusionReason::ForbiddenProperty(p) => p,
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::UnknownNamespace(p) => {
                write!(f, "no active provider for namespace `{}`", p.namespace)
            }
            ExclusionReason::UnknownFeature(p) => {
                write!(f, "provider `{}` does not declare feature `{}`", p.namespace, p.feature)
            }
            ExclusionReason::UnsupportedValue(p) => write!(f, "`{}` is not supported here", p),
            ExclusionReason::ForbiddenNamespace(p) => {
                write!(f, "namespace `{}` is forbidden", p.namespace)
            }
            ExclusionReason::ForbiddenFeature(p) => {
                write!(f, "feature `{}` is forbidden", p.feature_key())
            }
            ExclusionReason::ForbiddenProperty(p) => write!(f, "property `{}` is forbidden", p),
        }
    }
}

/// A candidate that did not make it into the ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excluded {
    pub variant: Variant,
    pub reason: ExclusionReason,
}

impl fmt::Display for Excluded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.variant.hash(), self.reason)
    }
}

/// Check one variant against the active providers and the exclusions.
/// Returns `None` when the variant is compatible.
pub fn check_compatibility(
    variant: &Variant,
    providers: &HashMap<Name, &ProviderCapabilitySet>,
    exclusions: &Exclusions,
) -> Option<ExclusionReason> {
    for prop in variant.properties() {
        let Some(provider) = providers.get(&prop.namespace) else {
            return Some(ExclusionReason::UnknownNamespace(prop.clone()));
        };
        match provider.check(prop) {
            Support::Supported => {}
            Support::UnknownFeature => return Some(ExclusionReason::UnknownFeature(prop.clone())),
            Support::UnsupportedValue => {
                return Some(ExclusionReason::UnsupportedValue(prop.clone()))
            }
            Support::ForeignNamespace => {
                return Some(ExclusionReason::UnknownNamespace(prop.clone()))
            }
        }
        if let Some(reason) = exclusions.check(prop) {
            return Some(reason);
        }
    }
    None
}

/// Collapse candidates that repeat an identifier with identical properties.
///
/// The first occurrence is kept. Two candidates sharing an identifier but
/// carrying different properties are an [`VariantError::IdentifierCollision`].
pub fn dedupe(candidates: &[Variant]) -> Result<Vec<Variant>> {
    let mut seen: HashMap<VariantHash, &Variant> = HashMap::with_capacity(candidates.len());
    let mut unique = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match seen.get(&candidate.hash()) {
            Some(previous) if *previous == candidate => {
                tracing::debug!("Ignoring duplicate candidate `{}`", candidate.hash());
            }
            Some(_) => {
                return Err(VariantError::IdentifierCollision {
                    identifier: candidate.hash().to_string(),
                });
            }
            None => {
                seen.insert(candidate.hash(), candidate);
                unique.push(candidate.clone());
            }
        }
    }
    Ok(unique)
}

/// Split candidates into compatible ones (input order preserved) and
/// excluded ones with their reasons.
pub fn filter_compatible(
    candidates: &[Variant],
    active: &[ProviderCapabilitySet],
    exclusions: &Exclusions,
) -> (Vec<Variant>, Vec<Excluded>) {
    let providers: HashMap<Name, &ProviderCapabilitySet> =
        active.iter().map(|p| (p.namespace(), p)).collect();

    let mut compatible = Vec::with_capacity(candidates.len());
    let mut excluded = Vec::new();

    for candidate in candidates {
        match check_compatibility(candidate, &providers, exclusions) {
            None => compatible.push(candidate.clone()),
            Some(reason) => {
                tracing::debug!("Excluding `{}`: {}", candidate.hash(), reason);
                excluded.push(Excluded {
                    variant: candidate.clone(),
                    reason,
                });
            }
        }
    }

    (compatible, excluded)
}
