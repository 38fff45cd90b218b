//! Priority policy - three lazy lists turned into precomputed rank tables.
//!
//! Each list only names the entries a user wants promoted; everything else
//! keeps the order its provider declared. At construction every supported
//! property of every active provider is placed in one global order:
//!
//! 1. properties named in `property_priorities`, in listed order;
//! 2. properties of features named in `feature_priorities`, in listed order,
//!    values in declaration order;
//! 3. all remaining properties by namespace rank, then feature declaration
//!    order, then value declaration order.
//!
//! Feature and value ranks are read off that order. Ranking a variant is
//! then nothing but table lookups.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::name::Name;
use crate::core::property::{VariantFeature, VariantProperty};
use crate::core::provider::ProviderCapabilitySet;
use crate::errors::{Result, VariantError};
use crate::util::diagnostic::Diagnostic;

/// The raw policy document: three arrays of `::`-delimited keys.
///
/// Empty arrays are valid and mean "declaration order governs".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityLists {
    /// `namespace` entries.
    pub namespace_priorities: Vec<String>,
    /// `namespace :: feature` entries.
    pub feature_priorities: Vec<String>,
    /// `namespace :: feature :: value` entries.
    pub property_priorities: Vec<String>,
}

impl PriorityLists {
    pub fn new<N, F, P>(namespaces: N, features: F, properties: P) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        PriorityLists {
            namespace_priorities: namespaces.into_iter().map(Into::into).collect(),
            feature_priorities: features.into_iter().map(Into::into).collect(),
            property_priorities: properties.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespace_priorities.is_empty()
            && self.feature_priorities.is_empty()
            && self.property_priorities.is_empty()
    }

    /// Layer `lower` beneath `self`: entries of `self` come first, entries of
    /// `lower` not already present follow.
    pub fn overlay(&self, lower: &PriorityLists) -> PriorityLists {
        PriorityLists {
            namespace_priorities: merge_lazy(&self.namespace_priorities, &lower.namespace_priorities),
            feature_priorities: merge_lazy(&self.feature_priorities, &lower.feature_priorities),
            property_priorities: merge_lazy(&self.property_priorities, &lower.property_priorities),
        }
    }
}

fn merge_lazy(upper: &[String], lower: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    upper
        .iter()
        .chain(lower)
        .filter(|entry| seen.insert(entry.as_str()))
        .cloned()
        .collect()
}

/// Advisory condition found while building a policy. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyWarning {
    /// A prioritized namespace matches no active provider.
    UnusedNamespace(Name),
    /// A prioritized feature is not declared by any active provider.
    UnusedFeature(VariantFeature),
    /// A prioritized property is not supported by any active provider.
    UnusedProperty(VariantProperty),
}

impl PolicyWarning {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::warning(self.to_string())
            .with_suggestion("Remove the entry or install the provider that owns it")
    }
}

impl fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyWarning::UnusedNamespace(ns) => {
                write!(f, "namespace priority `{}` matches no active provider", ns)
            }
            PolicyWarning::UnusedFeature(feat) => {
                write!(f, "feature priority `{}` is not offered by any active provider", feat)
            }
            PolicyWarning::UnusedProperty(prop) => {
                write!(f, "property priority `{}` is not supported by any active provider", prop)
            }
        }
    }
}

/// Immutable, precomputed ranking configuration for one set of active
/// providers. Safe to share across threads.
#[derive(Debug, Clone)]
pub struct PriorityPolicy {
    namespaces: Vec<Name>,
    namespace_rank: HashMap<Name, usize>,
    features: Vec<VariantFeature>,
    feature_rank: HashMap<VariantFeature, usize>,
    properties: Vec<VariantProperty>,
    property_rank: HashMap<VariantProperty, usize>,
    value_rank: HashMap<VariantProperty, usize>,
    warnings: Vec<PolicyWarning>,
}

impl PriorityPolicy {
    /// Build the policy for the given active providers.
    ///
    /// Fails with [`VariantError::Configuration`] when more than one provider
    /// is active and any of their namespaces is missing from
    /// `namespace_priorities`, or when two providers claim one namespace.
    pub fn build(lists: &PriorityLists, active: &[ProviderCapabilitySet]) -> Result<Self> {
        let explicit_namespaces = parse_unique(&lists.namespace_priorities, |s| Name::namespace(s.trim()))?;
        let explicit_features = parse_unique(&lists.feature_priorities, |s| s.parse::<VariantFeature>())?;
        let explicit_properties =
            parse_unique(&lists.property_priorities, |s| s.parse::<VariantProperty>())?;

        let mut active_namespaces: Vec<Name> = Vec::with_capacity(active.len());
        for provider in active {
            if active_namespaces.contains(&provider.namespace()) {
                return Err(VariantError::configuration(format!(
                    "more than one active provider claims namespace `{}`",
                    provider.namespace()
                )));
            }
            active_namespaces.push(provider.namespace());
        }

        if active.len() > 1 {
            let missing: Vec<&str> = active_namespaces
                .iter()
                .filter(|ns| !explicit_namespaces.contains(ns))
                .map(|ns| ns.as_str())
                .collect();
            if !missing.is_empty() {
                return Err(VariantError::configuration(format!(
                    "`namespace_priorities` must list every active provider namespace when \
                     several are active; missing: {}",
                    missing.join(", ")
                )));
            }
        }

        let mut warnings = Vec::new();

        // Lazy namespace list: explicit entries first, then the rest in
        // declaration order.
        let mut namespaces: Vec<Name> = Vec::with_capacity(active_namespaces.len());
        for ns in &explicit_namespaces {
            if active_namespaces.contains(ns) {
                namespaces.push(*ns);
            } else {
                tracing::warn!("Namespace priority `{}` matches no active provider", ns);
                warnings.push(PolicyWarning::UnusedNamespace(*ns));
            }
        }
        for ns in &active_namespaces {
            if !namespaces.contains(ns) {
                namespaces.push(*ns);
            }
        }
        let namespace_rank: HashMap<Name, usize> =
            namespaces.iter().enumerate().map(|(i, ns)| (*ns, i)).collect();

        let property_pos: HashMap<&VariantProperty, usize> =
            explicit_properties.iter().enumerate().map(|(i, p)| (p, i)).collect();
        let feature_pos: HashMap<&VariantFeature, usize> =
            explicit_features.iter().enumerate().map(|(i, f)| (f, i)).collect();

        let mut keyed: Vec<((u8, usize, usize, usize, usize), VariantProperty)> = Vec::new();
        let mut declared_features: HashSet<VariantFeature> = HashSet::new();
        for provider in active {
            let ns_rank = namespace_rank[&provider.namespace()];
            for (feature_idx, feature) in provider.features().iter().enumerate() {
                declared_features.insert(VariantFeature {
                    namespace: provider.namespace(),
                    feature: feature.name,
                });
                for (value_idx, value) in feature.values().iter().enumerate() {
                    let prop = VariantProperty {
                        namespace: provider.namespace(),
                        feature: feature.name,
                        value: value.clone(),
                    };
                    let key = if let Some(&pos) = property_pos.get(&prop) {
                        (0, pos, 0, 0, 0)
                    } else if let Some(&pos) = feature_pos.get(&prop.feature_key()) {
                        (1, pos, value_idx, 0, 0)
                    } else {
                        (2, ns_rank, feature_idx, value_idx, 0)
                    };
                    keyed.push((key, prop));
                }
            }
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let supported: HashSet<&VariantProperty> = keyed.iter().map(|(_, p)| p).collect();
        for prop in &explicit_properties {
            if !supported.contains(prop) {
                tracing::warn!("Property priority `{}` is not supported by any active provider", prop);
                warnings.push(PolicyWarning::UnusedProperty(prop.clone()));
            }
        }
        for feat in &explicit_features {
            if !declared_features.contains(feat) {
                tracing::warn!("Feature priority `{}` is not offered by any active provider", feat);
                warnings.push(PolicyWarning::UnusedFeature(*feat));
            }
        }

        let properties: Vec<VariantProperty> = keyed.into_iter().map(|(_, p)| p).collect();
        let mut features: Vec<VariantFeature> = Vec::new();
        let mut feature_rank: HashMap<VariantFeature, usize> = HashMap::new();
        let mut property_rank: HashMap<VariantProperty, usize> = HashMap::new();
        let mut value_rank: HashMap<VariantProperty, usize> = HashMap::new();
        let mut values_seen: HashMap<VariantFeature, usize> = HashMap::new();

        for (pos, prop) in properties.iter().enumerate() {
            let feat = prop.feature_key();
            if !feature_rank.contains_key(&feat) {
                feature_rank.insert(feat, features.len());
                features.push(feat);
            }
            let counter = values_seen.entry(feat).or_insert(0);
            value_rank.insert(prop.clone(), *counter);
            *counter += 1;
            property_rank.insert(prop.clone(), pos);
        }

        tracing::debug!(
            "Built priority policy: {} namespace(s), {} feature(s), {} propert(ies)",
            namespaces.len(),
            features.len(),
            properties.len()
        );

        Ok(PriorityPolicy {
            namespaces,
            namespace_rank,
            features,
            feature_rank,
            properties,
            property_rank,
            value_rank,
            warnings,
        })
    }

    /// Position of a namespace in the resolved namespace list.
    pub fn namespace_rank(&self, namespace: Name) -> Option<usize> {
        self.namespace_rank.get(&namespace).copied()
    }

    /// Position of a feature's first appearance in the global order.
    pub fn feature_rank(&self, feature: &VariantFeature) -> Option<usize> {
        self.feature_rank.get(feature).copied()
    }

    /// Position of a property in the global order.
    pub fn property_rank(&self, property: &VariantProperty) -> Option<usize> {
        self.property_rank.get(property).copied()
    }

    /// Position of a property's value among the values of its feature.
    pub fn value_rank(&self, property: &VariantProperty) -> Option<usize> {
        self.value_rank.get(property).copied()
    }

    /// Resolved namespace order.
    pub fn namespaces(&self) -> &[Name] {
        &self.namespaces
    }

    /// Features in rank order.
    pub fn features(&self) -> &[VariantFeature] {
        &self.features
    }

    /// Every supported property, most preferred first.
    pub fn properties(&self) -> &[VariantProperty] {
        &self.properties
    }

    pub fn warnings(&self) -> &[PolicyWarning] {
        &self.warnings
    }
}

fn parse_unique<T, F>(raw: &[String], parse: F) -> Result<Vec<T>>
where
    T: PartialEq,
    F: Fn(&str) -> Result<T>,
{
    let mut out: Vec<T> = Vec::with_capacity(raw.len());
    for entry in raw {
        let parsed = parse(entry)?;
        if !out.contains(&parsed) {
            out.push(parsed);
        }
    }
    Ok(out)
}
