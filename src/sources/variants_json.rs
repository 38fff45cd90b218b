//! `variants.json` - the variant source document published with a package.
//!
//! ```json
//! {
//!   "default-priorities": {
//!     "namespace": ["fictional_hw", "fictional_tech"],
//!     "feature": [],
//!     "property": []
//!   },
//!   "providers": {
//!     "fictional_hw": { "requires": ["provider-fictional-hw"] }
//!   },
//!   "variants": {
//!     "03e04d5e": { "fictional_hw": { "architecture": "mother", "compute_capability": "4" } }
//!   }
//! }
//! ```
//!
//! Every identifier must match the hash of its own body.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::name::Name;
use crate::core::property::{VariantFeature, VariantProperty};
use crate::core::provider::ProviderInfo;
use crate::core::variant::{Variant, VariantHash};
use crate::errors::{Result, VariantError};
use crate::resolver::policy::PriorityLists;

/// Conventional file name of the document.
pub const VARIANTS_JSON_FILENAME: &str = "variants.json";

/// The `default-priorities` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct DefaultPriorities {
    namespace: Vec<String>,
    feature: Vec<String>,
    property: Vec<String>,
}

impl From<DefaultPriorities> for PriorityLists {
    fn from(raw: DefaultPriorities) -> Self {
        PriorityLists {
            namespace_priorities: raw.namespace,
            feature_priorities: raw.feature,
            property_priorities: raw.property,
        }
    }
}

impl From<&PriorityLists> for DefaultPriorities {
    fn from(lists: &PriorityLists) -> Self {
        DefaultPriorities {
            namespace: lists.namespace_priorities.clone(),
            feature: lists.feature_priorities.clone(),
            property: lists.property_priorities.clone(),
        }
    }
}

type RawBody = Entries<Entries<String>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawDocument {
    variants: Entries<RawBody>,
    #[serde(default)]
    default_priorities: DefaultPriorities,
    #[serde(default)]
    providers: IndexMap<String, ProviderInfo>,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct DocumentOut<'a> {
    default_priorities: DefaultPriorities,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    providers: IndexMap<&'a str, &'a ProviderInfo>,
    variants: IndexMap<String, IndexMap<&'a str, IndexMap<&'a str, &'a str>>>,
}

/// Map entries in document order, repeated keys included.
#[derive(Debug)]
struct Entries<V>(Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = Entries<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// A parsed and verified `variants.json` document.
#[derive(Debug, Clone)]
pub struct VariantsJson {
    variants: IndexMap<VariantHash, Variant>,
    default_priorities: PriorityLists,
    providers: IndexMap<Name, ProviderInfo>,
}

impl VariantsJson {
    /// Assemble a document from already-built parts.
    ///
    /// Fails when the default priorities are malformed, or when providers are
    /// given and `namespace` priorities do not name exactly those providers.
    pub fn new(
        variants: impl IntoIterator<Item = Variant>,
        default_priorities: PriorityLists,
        providers: IndexMap<Name, ProviderInfo>,
    ) -> Result<Self> {
        check_priorities(&default_priorities)?;

        if !providers.is_empty() {
            let listed: HashSet<&str> = default_priorities
                .namespace_priorities
                .iter()
                .map(|s| s.trim())
                .collect();
            let declared: HashSet<&str> = providers.keys().map(|n| n.as_str()).collect();
            if listed != declared {
                let mut listed: Vec<&str> = listed.into_iter().collect();
                let mut declared: Vec<&str> = declared.into_iter().collect();
                listed.sort_unstable();
                declared.sort_unstable();
                return Err(VariantError::configuration(format!(
                    "`default-priorities.namespace` must name the same namespaces as \
                     `providers`; currently [{}] vs [{}]",
                    listed.join(", "),
                    declared.join(", ")
                )));
            }
        }

        let mut by_hash: IndexMap<VariantHash, Variant> = IndexMap::new();
        for variant in variants {
            match by_hash.get(&variant.hash()) {
                Some(existing) if *existing == variant => {
                    tracing::debug!("Ignoring repeated variant `{}`", variant.hash());
                }
                Some(_) => {
                    return Err(VariantError::IdentifierCollision {
                        identifier: variant.hash().to_string(),
                    })
                }
                None => {
                    by_hash.insert(variant.hash(), variant);
                }
            }
        }

        Ok(VariantsJson {
            variants: by_hash,
            default_priorities,
            providers,
        })
    }

    /// Parse a document from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: RawDocument = serde_json::from_slice(bytes).map_err(|e| VariantError::MalformedRecord {
            message: e.to_string(),
        })?;
        Self::from_raw(raw)
    }

    /// Read and parse a document from disk.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_slice(&content).with_context(|| format!("invalid {}", path.display()))
    }

    fn from_raw(raw: RawDocument) -> Result<Self> {
        let mut seen: IndexMap<VariantHash, Variant> = IndexMap::new();

        for (key, body) in raw.variants.0 {
            let declared: VariantHash = key.parse()?;
            let variant = variant_from_body(&body)?;

            if let Some(previous) = seen.get(&declared) {
                if *previous != variant {
                    return Err(VariantError::IdentifierCollision { identifier: key });
                }
                continue;
            }
            if variant.hash() != declared {
                return Err(VariantError::IdentifierMismatch {
                    declared: key,
                    computed: variant.hash().to_string(),
                });
            }
            seen.insert(declared, variant);
        }

        let mut providers = IndexMap::with_capacity(raw.providers.len());
        for (namespace, info) in raw.providers {
            providers.insert(Name::namespace(&namespace)?, info);
        }

        Self::new(seen.into_values(), raw.default_priorities.into(), providers)
    }

    /// Variants in document order.
    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.values()
    }

    /// All variants as a candidate list for ranking.
    pub fn candidates(&self) -> Vec<Variant> {
        self.variants.values().cloned().collect()
    }

    pub fn get(&self, hash: VariantHash) -> Option<&Variant> {
        self.variants.get(&hash)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// The package author's priorities.
    pub fn default_priorities(&self) -> &PriorityLists {
        &self.default_priorities
    }

    /// Provider metadata keyed by namespace.
    pub fn providers(&self) -> &IndexMap<Name, ProviderInfo> {
        &self.providers
    }

    /// Every namespace referenced by a variant, in first-seen order.
    pub fn namespaces(&self) -> Vec<Name> {
        let mut seen: Vec<Name> = Vec::new();
        for prop in self.variants.values().flat_map(|v| v.properties()) {
            if !seen.contains(&prop.namespace) {
                seen.push(prop.namespace);
            }
        }
        seen
    }

    /// Render the document as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        let out = DocumentOut {
            default_priorities: DefaultPriorities::from(&self.default_priorities),
            providers: self
                .providers
                .iter()
                .map(|(ns, info)| (ns.as_str(), info))
                .collect(),
            variants: self
                .variants
                .iter()
                .map(|(hash, variant)| (hash.to_string(), body_of(variant)))
                .collect(),
        };
        serde_json::to_string_pretty(&out).map_err(|e| VariantError::MalformedRecord {
            message: e.to_string(),
        })
    }
}

impl FromStr for VariantsJson {
    type Err = VariantError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_slice(s.as_bytes())
    }
}

/// Repeated features inside one namespace surface as
/// [`VariantError::DuplicateFeature`] from [`Variant::new`].
fn variant_from_body(body: &RawBody) -> Result<Variant> {
    let mut namespaces: HashSet<&str> = HashSet::new();
    let mut properties = Vec::new();
    for (namespace, features) in &body.0 {
        if !namespaces.insert(namespace.as_str()) {
            return Err(VariantError::MalformedRecord {
                message: format!("namespace `{}` appears more than once", namespace),
            });
        }
        if features.0.is_empty() {
            return Err(VariantError::MalformedRecord {
                message: format!("namespace `{}` declares no features", namespace),
            });
        }
        for (feature, value) in &features.0 {
            properties.push(VariantProperty::new(namespace, feature, value)?);
        }
    }
    Variant::new(properties)
}

fn body_of(variant: &Variant) -> IndexMap<&str, IndexMap<&str, &str>> {
    let mut body: IndexMap<&str, IndexMap<&str, &str>> = IndexMap::new();
    for prop in variant.properties() {
        body.entry(prop.namespace.as_str())
            .or_default()
            .insert(prop.feature.as_str(), prop.value());
    }
    body
}

fn check_priorities(lists: &PriorityLists) -> Result<()> {
    for ns in &lists.namespace_priorities {
        Name::namespace(ns.trim())?;
    }
    for feat in &lists.feature_priorities {
        feat.parse::<VariantFeature>()?;
    }
    for prop in &lists.property_priorities {
        prop.parse::<VariantProperty>()?;
    }
    Ok(())
}
