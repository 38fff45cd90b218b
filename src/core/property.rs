//! Variant properties - one `(namespace, feature, value)` assignment.
//!
//! Properties are immutable values. Ordering is lexicographic on
//! `(namespace, feature, value)` compared as UTF-8 bytes, which is the order
//! used for canonical hashing.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::name::{Name, NameKind};
use crate::errors::{Result, VariantError};

/// Separator between the components of a qualified key.
pub const KEY_SEPARATOR: &str = "::";

/// A `(namespace, feature)` pair: one axis a variant can be built along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantFeature {
    pub namespace: Name,
    pub feature: Name,
}

impl VariantFeature {
    pub fn new(namespace: &str, feature: &str) -> Result<Self> {
        Ok(VariantFeature {
            namespace: Name::namespace(namespace)?,
            feature: Name::feature(feature)?,
        })
    }
}

impl fmt::Display for VariantFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.namespace, self.feature)
    }
}

impl FromStr for VariantFeature {
    type Err = VariantError;

    /// Parse `namespace :: feature`; whitespace around `::` is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let parts = split_key(s, 2, "<namespace> :: <feature>")?;
        VariantFeature::new(parts[0], parts[1])
    }
}

/// A single variant property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantProperty {
    pub namespace: Name,
    pub feature: Name,
    pub value: Arc<str>,
}

impl VariantProperty {
    /// Build a property from raw strings, validating every component.
    pub fn new(namespace: &str, feature: &str, value: &str) -> Result<Self> {
        let namespace = Name::parse(NameKind::Namespace, namespace)?;
        let feature = Name::parse(NameKind::Feature, feature)?;
        Self::from_parts(namespace, feature, value)
    }

    /// Build a property from already-validated names.
    pub fn from_parts(namespace: Name, feature: Name, value: &str) -> Result<Self> {
        validate_value(namespace, feature, value)?;
        Ok(VariantProperty {
            namespace,
            feature,
            value: Arc::from(value),
        })
    }

    /// The feature this property assigns a value to.
    pub fn feature_key(&self) -> VariantFeature {
        VariantFeature {
            namespace: self.namespace,
            feature: self.feature,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for VariantProperty {
    /// Canonical textual form, also used for hashing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {} :: {}", self.namespace, self.feature, self.value)
    }
}

impl FromStr for VariantProperty {
    type Err = VariantError;

    /// Parse `namespace :: feature :: value`; whitespace around `::` is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let parts = split_key(s, 3, "<namespace> :: <feature> :: <value>")?;
        VariantProperty::new(parts[0], parts[1], parts[2])
    }
}

/// Check a property value: non-empty, no whitespace or control characters
/// (they frame the canonical encoding) and no `::` (it frames qualified keys).
pub fn validate_value(namespace: Name, feature: Name, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(VariantError::EmptyValue {
            namespace: namespace.to_string(),
            feature: feature.to_string(),
        });
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(VariantError::InvalidValue {
            value: value.to_string(),
            reason: "whitespace and control characters are not allowed",
        });
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(VariantError::InvalidValue {
            value: value.to_string(),
            reason: "`::` is reserved as the key separator",
        });
    }
    Ok(())
}

fn split_key<'a>(input: &'a str, arity: usize, expected: &'static str) -> Result<Vec<&'a str>> {
    let parts: Vec<&str> = input.split(KEY_SEPARATOR).map(str::trim).collect();
    if parts.len() != arity {
        return Err(VariantError::MalformedKey {
            input: input.to_string(),
            expected,
        });
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_property_tolerates_whitespace() {
        let compact: VariantProperty = "fictional_hw::architecture::mother".parse().unwrap();
        let spaced: VariantProperty = "  fictional_hw :: architecture :: mother ".parse().unwrap();

        assert_eq!(compact, spaced);
        assert_eq!(compact.to_string(), "fictional_hw :: architecture :: mother");
    }

    #[test]
    fn test_parse_property_with_symbolic_value() {
        let prop: VariantProperty = "fictional_hw :: compute_capability :: >=4,<6".parse().unwrap();
        assert_eq!(prop.value(), ">=4,<6");
    }

    #[test]
    fn test_parse_feature() {
        let feat: VariantFeature = "fictional_hw :: humor".parse().unwrap();
        assert_eq!(feat.namespace, "fictional_hw");
        assert_eq!(feat.feature, "humor");
        assert_eq!(feat.to_string(), "fictional_hw :: humor");
    }

    #[test]
    fn test_malformed_keys() {
        for input in ["a", "a::b", "a::b::c::d", "::"] {
            let err = input.parse::<VariantProperty>().unwrap_err();
            assert!(
                matches!(err, VariantError::MalformedKey { .. }),
                "{input}: {err:?}"
            );
        }
        assert!(matches!(
            "a::b::c".parse::<VariantFeature>(),
            Err(VariantError::MalformedKey { .. })
        ));
    }

    #[test]
    fn test_invalid_identifier() {
        let err = VariantProperty::new("namesp@ce", "feature", "value").unwrap_err();
        assert_eq!(
            err,
            VariantError::InvalidIdentifier {
                kind: "namespace",
                value: "namesp@ce".to_string(),
            }
        );

        let err = "ns :: feat ure :: value".parse::<VariantProperty>().unwrap_err();
        assert!(matches!(err, VariantError::InvalidIdentifier { kind: "feature", .. }));
    }

    #[test]
    fn test_empty_and_invalid_values() {
        assert_eq!(
            VariantProperty::new("ns", "feat", "").unwrap_err(),
            VariantError::EmptyValue {
                namespace: "ns".to_string(),
                feature: "feat".to_string(),
            }
        );
        assert!(matches!(
            VariantProperty::new("ns", "feat", "two words"),
            Err(VariantError::InvalidValue { .. })
        ));
        assert!(matches!(
            VariantProperty::new("ns", "feat", "line\nbreak"),
            Err(VariantError::InvalidValue { .. })
        ));
        assert!(matches!(
            VariantProperty::new("ns", "feat", "a::b"),
            Err(VariantError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_ordering_is_namespace_feature_value() {
        let mut props = vec![
            VariantProperty::new("b", "a", "a").unwrap(),
            VariantProperty::new("a", "b", "a").unwrap(),
            VariantProperty::new("a", "a", "b").unwrap(),
            VariantProperty::new("a", "a", "a").unwrap(),
        ];
        props.sort();

        let rendered: Vec<String> = props.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["a :: a :: a", "a :: a :: b", "a :: b :: a", "b :: a :: a"]
        );
    }

    #[test]
    fn test_equality_requires_all_fields() {
        let a = VariantProperty::new("ns", "feat", "1").unwrap();
        let b = VariantProperty::new("ns", "feat", "2").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.feature_key(), b.feature_key());
    }
}
