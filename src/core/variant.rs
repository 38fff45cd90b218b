//! Variants and their deterministic identity.
//!
//! A variant is an unordered set of properties with at most one value per
//! feature. Its identifier is the leading 4 bytes of a SHA-256 digest over
//! the sorted canonical encoding of its properties, rendered as 8 lowercase
//! hex characters. The empty set is the null variant, `00000000`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::property::{VariantFeature, VariantProperty};
use crate::errors::{Result, VariantError};
use crate::util::hash::Fingerprint;

/// Number of digest bytes kept in an identifier.
pub const VARIANT_HASH_BYTES: usize = 4;

/// Length of an identifier in hex characters.
pub const VARIANT_HASH_LEN: usize = VARIANT_HASH_BYTES * 2;

/// Deterministic short identifier of a variant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantHash([u8; VARIANT_HASH_BYTES]);

impl VariantHash {
    /// Identifier of the variant with no properties.
    pub const NULL: VariantHash = VariantHash([0; VARIANT_HASH_BYTES]);

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    pub fn as_bytes(&self) -> &[u8; VARIANT_HASH_BYTES] {
        &self.0
    }
}

impl fmt::Display for VariantHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for VariantHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariantHash({})", self)
    }
}

impl FromStr for VariantHash {
    type Err = VariantError;

    /// Parse exactly 8 lowercase hex characters.
    fn from_str(s: &str) -> Result<Self> {
        let well_formed = s.len() == VARIANT_HASH_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(VariantError::MalformedRecord {
                message: format!(
                    "`{}` is not a variant identifier ({} lowercase hex characters)",
                    s, VARIANT_HASH_LEN
                ),
            });
        }

        let mut bytes = [0u8; VARIANT_HASH_BYTES];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| VariantError::MalformedRecord {
            message: format!("`{}` is not a variant identifier: {}", s, e),
        })?;
        Ok(VariantHash(bytes))
    }
}

impl Serialize for VariantHash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VariantHash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Compute the identifier of a property set.
///
/// Fails with [`VariantError::DuplicateFeature`] if two properties assign the
/// same feature. The result does not depend on the order of `properties`.
pub fn compute_hash<'a>(
    properties: impl IntoIterator<Item = &'a VariantProperty>,
) -> Result<VariantHash> {
    let mut sorted: Vec<&VariantProperty> = properties.into_iter().collect();
    sorted.sort();
    check_unique_features(sorted.iter().copied())?;
    Ok(hash_sorted(sorted.iter().copied()))
}

fn hash_sorted<'a>(sorted: impl IntoIterator<Item = &'a VariantProperty>) -> VariantHash {
    let lines: Vec<String> = sorted.into_iter().map(|p| p.to_string()).collect();
    if lines.is_empty() {
        return VariantHash::NULL;
    }

    let mut fp = Fingerprint::new();
    fp.update_lines(lines.iter().map(String::as_str));
    VariantHash(fp.finish_prefix())
}

fn check_unique_features<'a>(properties: impl IntoIterator<Item = &'a VariantProperty>) -> Result<()> {
    let mut seen: HashSet<VariantFeature> = HashSet::new();
    for prop in properties {
        if !seen.insert(prop.feature_key()) {
            return Err(VariantError::DuplicateFeature {
                namespace: prop.namespace.to_string(),
                feature: prop.feature.to_string(),
            });
        }
    }
    Ok(())
}

/// An immutable, cheaply clonable variant.
#[derive(Clone)]
pub struct Variant {
    inner: Arc<VariantInner>,
}

struct VariantInner {
    /// Sorted by `(namespace, feature, value)`.
    properties: Vec<VariantProperty>,
    hash: VariantHash,
}

impl Variant {
    /// Build a variant from a property set. The identifier is computed here
    /// and cached for the lifetime of the value.
    pub fn new(properties: impl IntoIterator<Item = VariantProperty>) -> Result<Self> {
        let mut properties: Vec<VariantProperty> = properties.into_iter().collect();
        properties.sort();
        check_unique_features(&properties)?;
        let hash = hash_sorted(&properties);

        Ok(Variant {
            inner: Arc::new(VariantInner { properties, hash }),
        })
    }

    /// The variant with no properties.
    pub fn null() -> Self {
        Variant {
            inner: Arc::new(VariantInner {
                properties: Vec::new(),
                hash: VariantHash::NULL,
            }),
        }
    }

    /// Parse every `namespace :: feature :: value` key and build a variant.
    pub fn from_keys<S: AsRef<str>>(keys: impl IntoIterator<Item = S>) -> Result<Self> {
        let properties = keys
            .into_iter()
            .map(|k| k.as_ref().parse::<VariantProperty>())
            .collect::<Result<Vec<_>>>()?;
        Self::new(properties)
    }

    /// The identifier of this variant.
    pub fn hash(&self) -> VariantHash {
        self.inner.hash
    }

    /// Properties in canonical order.
    pub fn properties(&self) -> &[VariantProperty] {
        &self.inner.properties
    }

    pub fn is_null(&self) -> bool {
        self.inner.properties.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_null()
    }

    /// The value this variant assigns to `feature`, if any.
    pub fn get(&self, feature: &VariantFeature) -> Option<&VariantProperty> {
        self.inner
            .properties
            .iter()
            .find(|p| p.namespace == feature.namespace && p.feature == feature.feature)
    }

    /// Canonical byte serialization: one `namespace :: feature :: value` line
    /// per property, in sorted order.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for prop in &self.inner.properties {
            out.extend_from_slice(prop.to_string().as_bytes());
            out.push(b'\n');
        }
        out
    }

    /// Human-readable multi-line description.
    pub fn pretty_print(&self) -> String {
        let mut out = format!("Variant `{}`", self.hash());
        if self.is_null() {
            out.push_str(" (null variant)");
        }
        for prop in self.properties() {
            out.push_str(&format!("\n  {}", prop));
        }
        out
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.inner.properties == other.inner.properties
    }
}

impl Eq for Variant {}

impl std::hash::Hash for Variant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.hash.hash(state);
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("hash", &self.inner.hash)
            .field("properties", &self.inner.properties.len())
            .finish()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.hash)
    }
}
