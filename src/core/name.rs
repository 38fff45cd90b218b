//! Validated, interned identifiers for namespaces and features.
//!
//! The same handful of namespace and feature names appear in every variant,
//! every capability set and every priority list. Interning them makes
//! [`Name`] a `Copy` type with pointer equality, so properties can be shared
//! freely across variants.
//!
//! Interned strings live for the rest of the process. Every distinct valid
//! name seen by any document stays in the table, so a long-running process
//! that reads untrusted `variants.json` files from many sources grows it by
//! one entry per new name. Names are validated before they are interned, so
//! rejected input never reaches the table.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{LazyLock, PoisonError, RwLock};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Result, VariantError};

/// Pattern every namespace and feature name must match.
pub const IDENTIFIER_PATTERN: &str = "[A-Za-z0-9_-]+";

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{}$", IDENTIFIER_PATTERN)).expect("identifier pattern is valid")
});

static INTERNER: LazyLock<RwLock<HashSet<&'static str>>> =
    LazyLock::new(|| RwLock::new(HashSet::new()));

/// Which kind of identifier is being validated, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Namespace,
    Feature,
}

impl NameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameKind::Namespace => "namespace",
            NameKind::Feature => "feature",
        }
    }
}

/// An interned namespace or feature name.
///
/// Construction validates the identifier charset; every `Name` in existence is
/// therefore a legal identifier.
#[derive(Clone, Copy)]
pub struct Name {
    inner: &'static str,
}

impl Name {
    /// Validate and intern an identifier.
    pub fn parse(kind: NameKind, s: &str) -> Result<Self> {
        if !is_valid_identifier(s) {
            return Err(VariantError::InvalidIdentifier {
                kind: kind.as_str(),
                value: s.to_string(),
            });
        }
        Ok(Self::intern(s))
    }

    /// Validate and intern a namespace name.
    pub fn namespace(s: &str) -> Result<Self> {
        Self::parse(NameKind::Namespace, s)
    }

    /// Validate and intern a feature name.
    pub fn feature(s: &str) -> Result<Self> {
        Self::parse(NameKind::Feature, s)
    }

    fn intern(s: &str) -> Self {
        {
            let interner = INTERNER.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&interned) = interner.get(s) {
                return Name { inner: interned };
            }
        }

        let mut interner = INTERNER.write().unwrap_or_else(PoisonError::into_inner);

        // Another thread may have interned it between the two locks.
        if let Some(&interned) = interner.get(s) {
            return Name { inner: interned };
        }

        let leaked: &'static str = Box::leak(s.to_string().into_boxed_str());
        interner.insert(leaked);

        Name { inner: leaked }
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.inner
    }
}

/// Check a string against the identifier charset.
pub fn is_valid_identifier(s: &str) -> bool {
    IDENTIFIER_RE.is_match(s)
}

impl Deref for Name {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        self.inner
    }
}

impl AsRef<str> for Name {
    #[inline]
    fn as_ref(&self) -> &str {
        self.inner
    }
}

impl Borrow<str> for Name {
    #[inline]
    fn borrow(&self) -> &str {
        self.inner
    }
}

impl PartialEq for Name {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for Name {}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.inner == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.inner == *other
    }
}

impl PartialOrd for Name {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    /// Byte-wise lexicographic, independent of interning order.
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.as_bytes().cmp(other.inner.as_bytes())
    }
}

impl Hash for Name {
    /// Hashes the content, not the pointer, so `Borrow<str>` lookups agree.
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.inner, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner, f)
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.inner.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if !is_valid_identifier(&s) {
            return Err(serde::de::Error::custom(format!(
                "invalid identifier `{}`: only ASCII letters, digits, `_` and `-` are allowed",
                s
            )));
        }
        Ok(Name::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_equality() {
        let a = Name::namespace("fictional_hw").unwrap();
        let b = Name::namespace("fictional_hw").unwrap();
        let c = Name::namespace("fictional_tech").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(std::ptr::eq(a.inner, b.inner));
    }

    #[test]
    fn test_identifier_charset() {
        assert!(Name::feature("compute_capability").is_ok());
        assert!(Name::feature("avx-512").is_ok());
        assert!(Name::feature("X86_64").is_ok());

        for bad in ["", "feature@variant", "has space", "a::b", "dot.ted", "ünïcode"] {
            let err = Name::feature(bad).unwrap_err();
            assert_eq!(
                err,
                VariantError::InvalidIdentifier {
                    kind: "feature",
                    value: bad.to_string(),
                }
            );
        }
    }

    #[test]
    fn test_rejected_names_are_not_interned() {
        let bad = "rejected name@never-interned";
        assert!(Name::namespace(bad).is_err());
        assert!(!INTERNER.read().unwrap().contains(bad));

        let good = "accepted_name_interned_once";
        let first = Name::namespace(good).unwrap();
        let second = Name::feature(good).unwrap();
        assert!(std::ptr::eq(first.inner, second.inner));
        assert!(INTERNER.read().unwrap().contains(good));
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let upper = Name::namespace("Zeta").unwrap();
        let lower = Name::namespace("alpha").unwrap();
        // 'Z' (0x5a) sorts before 'a' (0x61)
        assert!(upper < lower);
    }

    #[test]
    fn test_borrow_lookup() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(Name::namespace("ns").unwrap(), 1);
        assert_eq!(map.get("ns"), Some(&1));
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        let ok: Name = serde_json::from_str("\"fictional_hw\"").unwrap();
        assert_eq!(ok, "fictional_hw");

        assert!(serde_json::from_str::<Name>("\"namesp@ce\"").is_err());
    }
}
