//! Resolution session - the explicit context every ranking call runs in.
//!
//! A session fixes the active providers, the priority policy and the user's
//! exclusions once. It is immutable afterwards and can be shared freely
//! between threads.

use rayon::prelude::*;

use crate::core::marker::Environment;
use crate::core::name::Name;
use crate::core::provider::ProviderCapabilitySet;
use crate::core::variant::Variant;
use crate::errors::Result;
use crate::resolver::filter::Exclusions;
use crate::resolver::policy::{PriorityLists, PriorityPolicy};
use crate::resolver::resolve::{rank_with_exclusions, Resolution};

/// Providers, policy and exclusions for a series of rankings.
#[derive(Debug, Clone)]
pub struct Session {
    active: Vec<ProviderCapabilitySet>,
    inactive: Vec<Name>,
    policy: PriorityPolicy,
    exclusions: Exclusions,
}

impl Session {
    /// Evaluate each provider's `enable-if` marker against `env`, keep the
    /// enabled ones and build the policy for them.
    pub fn new(
        providers: impl IntoIterator<Item = ProviderCapabilitySet>,
        env: &Environment,
        lists: &PriorityLists,
    ) -> Result<Self> {
        let mut active = Vec::new();
        let mut inactive = Vec::new();

        for provider in providers {
            if provider.is_enabled(env)? {
                active.push(provider);
            } else {
                tracing::info!(
                    "Provider `{}` disabled by its enable-if marker",
                    provider.namespace()
                );
                inactive.push(provider.namespace());
            }
        }

        let policy = PriorityPolicy::build(lists, &active)?;

        Ok(Session {
            active,
            inactive,
            policy,
            exclusions: Exclusions::new(),
        })
    }

    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Rank one candidate set.
    pub fn rank(&self, candidates: &[Variant]) -> Result<Resolution> {
        rank_with_exclusions(candidates, &self.policy, &self.active, &self.exclusions)
    }

    /// Rank many independent candidate sets in parallel. Results are in input
    /// order; one failing set does not affect the others.
    pub fn rank_batch(&self, batches: &[Vec<Variant>]) -> Vec<Result<Resolution>> {
        batches.par_iter().map(|candidates| self.rank(candidates)).collect()
    }

    pub fn policy(&self) -> &PriorityPolicy {
        &self.policy
    }

    pub fn active_providers(&self) -> &[ProviderCapabilitySet] {
        &self.active
    }

    /// Namespaces whose providers were disabled by their marker.
    pub fn inactive_namespaces(&self) -> &[Name] {
        &self.inactive
    }

    /// Dependency specifiers of the active providers, for the install stage.
    pub fn requirements(&self) -> Vec<&str> {
        self.active
            .iter()
            .flat_map(|p| p.requires().iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::marker::Marker;
    use crate::core::provider::ProviderInfo;
    use crate::errors::VariantError;

    fn provider(namespace: &str, feature: &str, values: &[&str], info: ProviderInfo) -> ProviderCapabilitySet {
        ProviderCapabilitySet::build(namespace, [(feature, values.iter().copied())], info).unwrap()
    }

    fn env() -> Environment {
        Environment::new().with("python_version", "3.11")
    }

    #[test]
    fn test_disabled_provider_is_not_active() {
        let old_only = ProviderInfo::default()
            .with_enable_if(Marker::parse("python_version < '3.10'").unwrap())
            .with_requires(["old-plugin>=1"]);
        let providers = vec![
            provider("modern", "isa", &["v3", "v2"], ProviderInfo::default().with_requires(["modern-plugin"])),
            provider("legacy", "isa", &["v1"], old_only),
        ];

        // a single active provider needs no namespace priorities
        let session = Session::new(providers, &env(), &PriorityLists::default()).unwrap();

        assert_eq!(session.active_providers().len(), 1);
        assert_eq!(session.inactive_namespaces(), &[Name::namespace("legacy").unwrap()]);
        assert_eq!(session.requirements(), vec!["modern-plugin"]);

        let candidates = vec![
            Variant::from_keys(["legacy :: isa :: v1"]).unwrap(),
            Variant::from_keys(["modern :: isa :: v2"]).unwrap(),
            Variant::from_keys(["modern :: isa :: v3"]).unwrap(),
        ];
        let resolution = session.rank(&candidates).unwrap();
        assert_eq!(resolution.ranked(), &[candidates[2].clone(), candidates[1].clone()]);
        assert_eq!(resolution.excluded().len(), 1);
    }

    #[test]
    fn test_invalid_marker_variable_fails_session() {
        let info = ProviderInfo::default().with_enable_if(Marker::parse("no_such_var == '1'").unwrap());
        let err = Session::new(vec![provider("ns", "f", &["v"], info)], &env(), &PriorityLists::default())
            .unwrap_err();
        assert!(matches!(err, VariantError::InvalidMarker { .. }));
    }

    #[test]
    fn test_exclusions_apply() {
        let session = Session::new(
            vec![provider("ns", "f", &["a", "b"], ProviderInfo::default())],
            &env(),
            &PriorityLists::default(),
        )
        .unwrap()
        .with_exclusions(Exclusions::new().forbid_property("ns :: f :: a".parse().unwrap()));

        let a = Variant::from_keys(["ns :: f :: a"]).unwrap();
        let b = Variant::from_keys(["ns :: f :: b"]).unwrap();
        let resolution = session.rank(&[a, b.clone()]).unwrap();
        assert_eq!(resolution.ranked(), &[b]);
    }

    #[test]
    fn test_rank_batch_matches_sequential() {
        let session = Session::new(
            vec![provider("ns", "f", &["a", "b", "c"], ProviderInfo::default())],
            &env(),
            &PriorityLists::default(),
        )
        .unwrap();

        let batches: Vec<Vec<Variant>> = ["a", "b", "c", "z"]
            .iter()
            .map(|v| {
                vec![
                    Variant::null(),
                    Variant::from_keys([format!("ns :: f :: {v}")]).unwrap(),
                ]
            })
            .collect();

        let parallel = session.rank_batch(&batches);
        assert_eq!(parallel.len(), 4);
        for (batch, result) in batches.iter().zip(&parallel) {
            let sequential = session.rank(batch).unwrap();
            assert_eq!(result.as_ref().unwrap().hashes(), sequential.hashes());
        }
        // the unsupported value leaves only the null variant
        assert_eq!(parallel[3].as_ref().unwrap().len(), 1);
    }
}
