//! Sort keys for compatible variants.
//!
//! A variant's key lists, for every feature it sets, the feature's rank and
//! the rank of the chosen value, ordered by feature rank. Keys compare slot
//! by slot:
//!
//! - at the first differing feature rank, the key holding the more preferred
//!   feature wins (the other variant leaves that feature unset);
//! - at the first differing value rank, the more preferred value wins;
//! - when one key is a prefix of the other, the longer key wins.
//!
//! The null variant has the empty key and therefore sorts last.

use std::cmp::Ordering;

use crate::core::variant::Variant;
use crate::errors::{Result, VariantError};
use crate::resolver::policy::PriorityPolicy;

/// `(feature rank, value rank)` per property, sorted by feature rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey(Vec<(usize, usize)>);

impl SortKey {
    /// Compute the key of a compatible variant.
    ///
    /// Every property must be known to the policy; anything else means the
    /// policy was built for a different provider set.
    pub fn for_variant(variant: &Variant, policy: &PriorityPolicy) -> Result<Self> {
        let mut slots = Vec::with_capacity(variant.len());
        for prop in variant.properties() {
            let feature = policy.feature_rank(&prop.feature_key());
            let value = policy.value_rank(prop);
            match (feature, value) {
                (Some(f), Some(v)) => slots.push((f, v)),
                _ => {
                    return Err(VariantError::configuration(format!(
                        "`{}` has no rank in the priority policy; was it built for other providers?",
                        prop
                    )))
                }
            }
        }
        slots.sort_unstable();
        Ok(SortKey(slots))
    }

    pub fn slots(&self) -> &[(usize, usize)] {
        &self.0
    }
}

impl Ord for SortKey {
    /// `Less` means more preferred.
    fn cmp(&self, other: &Self) -> Ordering {
        for (&(fa, va), &(fb, vb)) in self.0.iter().zip(&other.0) {
            if fa != fb {
                return fa.cmp(&fb);
            }
            if va != vb {
                return va.cmp(&vb);
            }
        }
        other.0.len().cmp(&self.0.len())
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order over ranked variants: sort key, then canonical bytes, then
/// identifier.
pub fn compare(a: (&SortKey, &Variant), b: (&SortKey, &Variant)) -> Ordering {
    a.0.cmp(b.0)
        .then_with(|| a.1.canonical_bytes().cmp(&b.1.canonical_bytes()))
        .then_with(|| a.1.hash().cmp(&b.1.hash()))
}
