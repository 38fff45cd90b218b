//! Resolution - the ranked list of compatible variants.
//!
//! Once created, a Resolution is read-only. Ranking is pure: the same
//! candidates, policy and providers always produce the same list.

use crate::core::provider::ProviderCapabilitySet;
use crate::core::variant::{Variant, VariantHash};
use crate::errors::{Result, VariantError};
use crate::resolver::filter::{dedupe, filter_compatible, Excluded, Exclusions};
use crate::resolver::policy::{PolicyWarning, PriorityPolicy};
use crate::resolver::sort::{compare, SortKey};

/// Outcome of ranking one candidate set.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Compatible variants, most preferred first. Never empty.
    ranked: Vec<Variant>,

    /// Candidates dropped by the compatibility filter, in input order.
    excluded: Vec<Excluded>,

    /// Advisory findings from the policy.
    warnings: Vec<PolicyWarning>,
}

impl Resolution {
    /// Ranked variants, most preferred first.
    pub fn ranked(&self) -> &[Variant] {
        &self.ranked
    }

    /// Identifiers in rank order.
    pub fn hashes(&self) -> Vec<VariantHash> {
        self.ranked.iter().map(Variant::hash).collect()
    }

    /// The most preferred variant.
    pub fn best(&self) -> &Variant {
        // a Resolution is only built from a non-empty ranking
        &self.ranked[0]
    }

    pub fn excluded(&self) -> &[Excluded] {
        &self.excluded
    }

    pub fn warnings(&self) -> &[PolicyWarning] {
        &self.warnings
    }

    /// Position of a variant in the ranking, if it was ranked.
    pub fn position(&self, hash: VariantHash) -> Option<usize> {
        self.ranked.iter().position(|v| v.hash() == hash)
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Human-readable report of the ranking and the exclusions.
    pub fn pretty_print(&self) -> String {
        let mut out = String::from("Ranked variants:");
        for (i, variant) in self.ranked.iter().enumerate() {
            out.push_str(&format!("\n  [{:03}] {}", i + 1, variant.hash()));
            for prop in variant.properties() {
                out.push_str(&format!("\n        {}", prop));
            }
        }
        if !self.excluded.is_empty() {
            out.push_str("\nExcluded:");
            for excluded in &self.excluded {
                out.push_str(&format!("\n  {}", excluded));
            }
        }
        out
    }
}

/// Rank candidates for the active providers.
pub fn rank(
    candidates: &[Variant],
    policy: &PriorityPolicy,
    active: &[ProviderCapabilitySet],
) -> Result<Resolution> {
    rank_with_exclusions(candidates, policy, active, &Exclusions::new())
}

/// Rank candidates for the active providers, dropping anything the user
/// forbade.
///
/// Fails with [`VariantError::NoCompatibleVariant`] when nothing survives the
/// filter, and with [`VariantError::IdentifierCollision`] when two different
/// candidates share an identifier.
pub fn rank_with_exclusions(
    candidates: &[Variant],
    policy: &PriorityPolicy,
    active: &[ProviderCapabilitySet],
    exclusions: &Exclusions,
) -> Result<Resolution> {
    let unique = dedupe(candidates)?;
    let (compatible, excluded) = filter_compatible(&unique, active, exclusions);

    if compatible.is_empty() {
        return Err(VariantError::NoCompatibleVariant {
            candidates: unique.len(),
            excluded: excluded.iter().map(ToString::to_string).collect(),
        });
    }

    let mut keyed: Vec<(SortKey, Variant)> = compatible
        .into_iter()
        .map(|v| SortKey::for_variant(&v, policy).map(|k| (k, v)))
        .collect::<Result<_>>()?;
    keyed.sort_by(|a, b| compare((&a.0, &a.1), (&b.0, &b.1)));

    let ranked: Vec<Variant> = keyed.into_iter().map(|(_, v)| v).collect();
    tracing::debug!(
        "Ranked {} of {} candidate(s); best is `{}`",
        ranked.len(),
        unique.len(),
        ranked[0].hash()
    );

    Ok(Resolution {
        ranked,
        excluded,
        warnings: policy.warnings().to_vec(),
    })
}
