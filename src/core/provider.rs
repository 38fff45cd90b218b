//! Provider capability sets.
//!
//! A provider owns one namespace and declares, for the current environment,
//! which features it supports and which values of each feature are usable.
//! Declaration order is meaningful: it is the default priority order for
//! features within the namespace and for values within a feature.
//!
//! The engine never loads plugins itself. Whatever discovers and runs them
//! implements [`CapabilityProvider`] and the engine queries that.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::marker::{Environment, Marker};
use crate::core::name::Name;
use crate::core::property::{validate_value, VariantProperty};
use crate::errors::{Result, VariantError};

/// Metadata about a provider, as published alongside the variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProviderInfo {
    /// Dependency specifiers needed to install the provider plugin. Opaque to
    /// the engine; recorded for the install stage.
    pub requires: Vec<String>,

    /// Environment predicate; the provider is inactive when it is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_if: Option<Marker>,

    /// Object reference of the plugin entry point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_api: Option<String>,

    /// An optional provider may be missing without failing resolution.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl ProviderInfo {
    pub fn with_requires(mut self, requires: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.requires = requires.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_enable_if(mut self, marker: Marker) -> Self {
        self.enable_if = Some(marker);
        self
    }

    pub fn with_plugin_api(mut self, plugin_api: impl Into<String>) -> Self {
        self.plugin_api = Some(plugin_api.into());
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

/// Supported values of one feature, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureCapability {
    pub name: Name,
    values: Vec<Arc<str>>,
}

impl FeatureCapability {
    pub fn values(&self) -> &[Arc<str>] {
        &self.values
    }

    pub fn supports(&self, value: &str) -> bool {
        self.values.iter().any(|v| &**v == value)
    }
}

/// How a capability set regards one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Supported,
    /// The property belongs to another namespace.
    ForeignNamespace,
    UnknownFeature,
    UnsupportedValue,
}

/// What one active provider supports in the current environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCapabilitySet {
    namespace: Name,
    features: Vec<FeatureCapability>,
    info: ProviderInfo,
}

impl ProviderCapabilitySet {
    /// Build a capability set from declared features, in declaration order.
    ///
    /// Feature names must be unique; repeated values within a feature are
    /// collapsed onto their first occurrence.
    pub fn build<F, V>(
        namespace: &str,
        declared: impl IntoIterator<Item = (F, V)>,
        info: ProviderInfo,
    ) -> Result<Self>
    where
        F: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let namespace = Name::namespace(namespace)?;
        let mut features: Vec<FeatureCapability> = Vec::new();

        for (feature, values) in declared {
            let name = Name::feature(feature.as_ref())?;
            if features.iter().any(|f| f.name == name) {
                return Err(VariantError::DuplicateFeature {
                    namespace: namespace.to_string(),
                    feature: name.to_string(),
                });
            }

            let mut unique: Vec<Arc<str>> = Vec::new();
            for value in values {
                let value = value.as_ref();
                validate_value(namespace, name, value)?;
                if !unique.iter().any(|v| &**v == value) {
                    unique.push(Arc::from(value));
                }
            }

            features.push(FeatureCapability {
                name,
                values: unique,
            });
        }

        Ok(ProviderCapabilitySet {
            namespace,
            features,
            info,
        })
    }

    pub fn namespace(&self) -> Name {
        self.namespace
    }

    /// Features in declaration order.
    pub fn features(&self) -> &[FeatureCapability] {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureCapability> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Position of a feature in declaration order.
    pub fn feature_index(&self, name: Name) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    pub fn info(&self) -> &ProviderInfo {
        &self.info
    }

    /// Dependency specifiers recorded for the install stage.
    pub fn requires(&self) -> &[String] {
        &self.info.requires
    }

    /// Evaluate the provider's `enable-if` marker. Providers without one are
    /// always enabled.
    pub fn is_enabled(&self, env: &Environment) -> Result<bool> {
        match &self.info.enable_if {
            Some(marker) => marker.evaluate(env),
            None => Ok(true),
        }
    }

    pub fn check(&self, property: &VariantProperty) -> Support {
        if property.namespace != self.namespace {
            return Support::ForeignNamespace;
        }
        match self.feature(&property.feature) {
            None => Support::UnknownFeature,
            Some(feature) if feature.supports(property.value()) => Support::Supported,
            Some(_) => Support::UnsupportedValue,
        }
    }

    pub fn permits(&self, property: &VariantProperty) -> bool {
        self.check(property) == Support::Supported
    }

    /// Every supported property, features and values in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = VariantProperty> + '_ {
        self.features.iter().flat_map(move |feature| {
            feature.values.iter().map(move |value| VariantProperty {
                namespace: self.namespace,
                feature: feature.name,
                value: Arc::clone(value),
            })
        })
    }

    pub fn pretty_print(&self) -> String {
        let mut out = format!("Provider `{}`", self.namespace);
        for (i, feature) in self.features.iter().enumerate() {
            let values: Vec<&str> = feature.values.iter().map(|v| &**v).collect();
            out.push_str(&format!(
                "\n  [{:03}] {} :: [{}]",
                i + 1,
                feature.name,
                values.join(", ")
            ));
        }
        out
    }
}

/// The answer a provider gives when queried: its namespace and the values it
/// supports per feature, most preferred first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub namespace: String,
    pub features: IndexMap<String, Vec<String>>,
}

/// A source of capabilities, typically a plugin run by an external loader.
pub trait CapabilityProvider: Send + Sync {
    /// Namespace the provider is registered under.
    fn namespace(&self) -> &str;

    /// Synchronously ask the provider what it supports here. `Ok(None)` means
    /// the provider gave no answer.
    fn query(&self) -> anyhow::Result<Option<ProviderResponse>>;
}

/// A provider whose capabilities are fixed up front, e.g. recorded at build
/// time for plugins that do not depend on the host.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    response: ProviderResponse,
}

impl StaticProvider {
    pub fn new<F, V, S>(namespace: &str, features: impl IntoIterator<Item = (F, V)>) -> Self
    where
        F: Into<String>,
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StaticProvider {
            response: ProviderResponse {
                namespace: namespace.to_string(),
                features: features
                    .into_iter()
                    .map(|(f, vs)| (f.into(), vs.into_iter().map(Into::into).collect()))
                    .collect(),
            },
        }
    }

    pub fn from_response(response: ProviderResponse) -> Self {
        StaticProvider { response }
    }
}

impl CapabilityProvider for StaticProvider {
    fn namespace(&self) -> &str {
        &self.response.namespace
    }

    fn query(&self) -> anyhow::Result<Option<ProviderResponse>> {
        Ok(Some(self.response.clone()))
    }
}

/// Query a provider and build its capability set.
///
/// Any failure of the collaborator, a missing answer, an answer for another
/// namespace or a malformed answer is a [`VariantError::ProviderQuery`].
pub fn query_capabilities(
    provider: &dyn CapabilityProvider,
    info: ProviderInfo,
) -> Result<ProviderCapabilitySet> {
    let expected = provider.namespace();

    let response = provider
        .query()
        .map_err(|e| VariantError::provider_query(expected, format!("{:#}", e)))?
        .ok_or_else(|| VariantError::provider_query(expected, "provider returned no capabilities"))?;

    if response.namespace != expected {
        return Err(VariantError::provider_query(
            expected,
            format!("answered for namespace `{}`", response.namespace),
        ));
    }

    tracing::debug!(
        "Provider `{}` supports {} feature(s)",
        expected,
        response.features.len()
    );

    ProviderCapabilitySet::build(&response.namespace, response.features, info)
        .map_err(|e| VariantError::provider_query(expected, format!("malformed response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hw() -> ProviderCapabilitySet {
        ProviderCapabilitySet::build(
            "fictional_hw",
            [
                ("architecture", vec!["deepthought", "tars", "mother"]),
                ("compute_capability", vec!["10", "8", "6", "4", "8"]),
            ],
            ProviderInfo::default(),
        )
        .unwrap()
    }

    fn prop(key: &str) -> VariantProperty {
        key.parse().unwrap()
    }

    #[test]
    fn test_build_keeps_declaration_order() {
        let caps = hw();
        let names: Vec<&str> = caps.features().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["architecture", "compute_capability"]);

        let values: Vec<&str> = caps.features()[1].values().iter().map(|v| &**v).collect();
        assert_eq!(values, vec!["10", "8", "6", "4"]);
    }

    #[test]
    fn test_build_rejects_duplicate_feature() {
        let err = ProviderCapabilitySet::build(
            "ns",
            [("feat", vec!["a"]), ("feat", vec!["b"])],
            ProviderInfo::default(),
        )
        .unwrap_err();
        assert!(matches!(err, VariantError::DuplicateFeature { .. }));
    }

    #[test]
    fn test_build_rejects_invalid_names() {
        let err = ProviderCapabilitySet::build("bad ns", Vec::<(&str, Vec<&str>)>::new(), ProviderInfo::default())
            .unwrap_err();
        assert!(matches!(err, VariantError::InvalidIdentifier { kind: "namespace", .. }));
    }

    #[test]
    fn test_check_support() {
        let caps = hw();
        assert_eq!(caps.check(&prop("fictional_hw::architecture::mother")), Support::Supported);
        assert_eq!(caps.check(&prop("fictional_hw::humor::10")), Support::UnknownFeature);
        assert_eq!(
            caps.check(&prop("fictional_hw::architecture::hal9000")),
            Support::UnsupportedValue
        );
        assert_eq!(caps.check(&prop("other::architecture::mother")), Support::ForeignNamespace);
        assert!(!caps.permits(&prop("fictional_hw::compute_capability::2")));
    }

    #[test]
    fn test_properties_enumeration() {
        let keys: Vec<String> = hw().properties().map(|p| p.to_string()).collect();
        assert_eq!(keys.len(), 7);
        assert_eq!(keys[0], "fictional_hw :: architecture :: deepthought");
        assert_eq!(keys[6], "fictional_hw :: compute_capability :: 4");
    }

    #[test]
    fn test_enable_if() {
        let info = ProviderInfo::default()
            .with_enable_if(Marker::parse("python_version >= '3.12'").unwrap())
            .with_requires(["provider-fictional-hw == 1.0.0"]);
        let caps = ProviderCapabilitySet::build("fictional_hw", [("humor", ["0"])], info).unwrap();

        let new = Environment::new().with("python_version", "3.12");
        let old = Environment::new().with("python_version", "3.11");
        assert!(caps.is_enabled(&new).unwrap());
        assert!(!caps.is_enabled(&old).unwrap());
        assert_eq!(caps.requires(), &["provider-fictional-hw == 1.0.0".to_string()]);
    }

    struct FailingProvider;

    impl CapabilityProvider for FailingProvider {
        fn namespace(&self) -> &str {
            "broken"
        }

        fn query(&self) -> anyhow::Result<Option<ProviderResponse>> {
            anyhow::bail!("plugin crashed")
        }
    }

    struct SilentProvider;

    impl CapabilityProvider for SilentProvider {
        fn namespace(&self) -> &str {
            "silent"
        }

        fn query(&self) -> anyhow::Result<Option<ProviderResponse>> {
            Ok(None)
        }
    }

    #[test]
    fn test_query_capabilities() {
        let provider = StaticProvider::new("fictional_tech", [("quantum", ["foam", "superposition"])]);
        let caps = query_capabilities(&provider, ProviderInfo::default()).unwrap();
        assert_eq!(caps.namespace(), "fictional_tech");
        assert!(caps.permits(&prop("fictional_tech::quantum::foam")));
    }

    #[test]
    fn test_query_failures_map_to_provider_query_error() {
        let err = query_capabilities(&FailingProvider, ProviderInfo::default()).unwrap_err();
        assert_eq!(
            err,
            VariantError::ProviderQuery {
                provider: "broken".to_string(),
                message: "plugin crashed".to_string(),
            }
        );

        let err = query_capabilities(&SilentProvider, ProviderInfo::default()).unwrap_err();
        assert!(matches!(err, VariantError::ProviderQuery { .. }));

        let wrong = StaticProvider::from_response(ProviderResponse {
            namespace: "fictional_hw".to_string(),
            features: IndexMap::new(),
        });
        struct Renamed(StaticProvider);
        impl CapabilityProvider for Renamed {
            fn namespace(&self) -> &str {
                "fictional_tech"
            }
            fn query(&self) -> anyhow::Result<Option<ProviderResponse>> {
                self.0.query()
            }
        }
        let err = query_capabilities(&Renamed(wrong), ProviderInfo::default()).unwrap_err();
        assert!(err.to_string().contains("answered for namespace `fictional_hw`"));

        let malformed = StaticProvider::new("fictional_hw", [("bad feature", ["1"])]);
        let err = query_capabilities(&malformed, ProviderInfo::default()).unwrap_err();
        assert!(err.to_string().contains("malformed response"));
    }

    #[test]
    fn test_provider_info_deserializes_kebab_case() {
        let info: ProviderInfo = serde_json::from_str(
            r#"{"requires": ["provider-fictional-hw == 1.0.0"],
                "enable-if": "python_version >= '3.12'",
                "plugin-api": "provider_fictional_hw.plugin:FictionalHWPlugin"}"#,
        )
        .unwrap();

        assert_eq!(info.requires.len(), 1);
        assert_eq!(
            info.enable_if.as_ref().map(Marker::as_str),
            Some("python_version >= '3.12'")
        );
        assert!(!info.optional);
    }
}
