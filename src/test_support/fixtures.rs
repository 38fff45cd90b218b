//! Test fixtures for common test scenarios.
//!
//! Two fictional providers, `fictional_hw` and `fictional_tech`, and a set of
//! variants whose identifiers are known ahead of time.

use indexmap::IndexMap;

use crate::core::name::Name;
use crate::core::provider::{
    query_capabilities, ProviderCapabilitySet, ProviderInfo, StaticProvider,
};
use crate::core::variant::Variant;
use crate::resolver::policy::PriorityLists;
use crate::sources::VariantsJson;

/// Features of `fictional_hw`, most preferred value first.
pub const FICTIONAL_HW: &[(&str, &[&str])] = &[
    ("architecture", &["deepthought", "tars", "hal9000", "mother"]),
    ("compute_accuracy", &["10", "8", "0"]),
    ("compute_capability", &["10", "6", "4"]),
    ("humor", &["2", "0"]),
];

/// Features of `fictional_tech`, most preferred value first.
pub const FICTIONAL_TECH: &[(&str, &[&str])] = &[
    ("quantum", &["superposition", "foam"]),
    ("risk_exposure", &["25", "1000000000"]),
    ("technology", &["auto_chef", "improb_drive"]),
];

/// Sample variants with their published identifiers.
pub const SAMPLE_VARIANTS: &[(&str, &[&str])] = &[
    (
        "03e04d5e",
        &[
            "fictional_hw :: architecture :: mother",
            "fictional_hw :: compute_capability :: 4",
        ],
    ),
    (
        "36028aca",
        &[
            "fictional_hw :: architecture :: deepthought",
            "fictional_hw :: compute_accuracy :: 10",
            "fictional_hw :: compute_capability :: 10",
            "fictional_hw :: humor :: 0",
            "fictional_tech :: quantum :: foam",
        ],
    ),
    (
        "3f7188c1",
        &[
            "fictional_hw :: architecture :: hal9000",
            "fictional_hw :: compute_accuracy :: 0",
            "fictional_hw :: compute_capability :: 6",
            "fictional_hw :: humor :: 2",
        ],
    ),
    (
        "7db6d39f",
        &[
            "fictional_tech :: quantum :: superposition",
            "fictional_tech :: risk_exposure :: 25",
            "fictional_tech :: technology :: auto_chef",
        ],
    ),
    (
        "808c7f9d",
        &[
            "fictional_tech :: quantum :: foam",
            "fictional_tech :: risk_exposure :: 1000000000",
            "fictional_tech :: technology :: improb_drive",
        ],
    ),
    ("00000000", &[]),
];

fn static_provider(namespace: &str, features: &[(&str, &[&str])]) -> StaticProvider {
    StaticProvider::new(
        namespace,
        features.iter().map(|(f, values)| (*f, values.iter().copied())),
    )
}

pub fn fictional_hw_provider() -> StaticProvider {
    static_provider("fictional_hw", FICTIONAL_HW)
}

pub fn fictional_tech_provider() -> StaticProvider {
    static_provider("fictional_tech", FICTIONAL_TECH)
}

pub fn fictional_hw_caps() -> ProviderCapabilitySet {
    query_capabilities(&fictional_hw_provider(), ProviderInfo::default())
        .expect("fictional_hw fixture is valid")
}

pub fn fictional_tech_caps() -> ProviderCapabilitySet {
    query_capabilities(&fictional_tech_provider(), ProviderInfo::default())
        .expect("fictional_tech fixture is valid")
}

/// The sample variants, in [`SAMPLE_VARIANTS`] order.
pub fn sample_variants() -> Vec<Variant> {
    SAMPLE_VARIANTS
        .iter()
        .map(|(_, keys)| Variant::from_keys(keys.iter()).expect("sample variant is valid"))
        .collect()
}

/// A `variants.json` document holding the sample variants and both providers.
pub fn sample_document() -> VariantsJson {
    sample_document_with(|_, _| {})
}

/// Like [`sample_document`], letting the caller adjust each provider's
/// metadata first.
pub fn sample_document_with(edit: impl Fn(&str, &mut ProviderInfo)) -> VariantsJson {
    let mut providers = IndexMap::new();
    for namespace in ["fictional_hw", "fictional_tech"] {
        let mut info = ProviderInfo::default()
            .with_requires([format!("provider-{}", namespace.replace('_', "-"))]);
        edit(namespace, &mut info);
        providers.insert(
            Name::namespace(namespace).expect("fixture namespace is valid"),
            info,
        );
    }

    VariantsJson::new(
        sample_variants(),
        PriorityLists::new(
            ["fictional_hw", "fictional_tech"],
            Vec::<String>::new(),
            Vec::<String>::new(),
        ),
        providers,
    )
    .expect("sample document is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_identifiers_match() {
        for ((expected, _), variant) in SAMPLE_VARIANTS.iter().zip(sample_variants()) {
            assert_eq!(variant.hash().to_string(), *expected);
        }
    }

    #[test]
    fn test_sample_variants_are_all_supported() {
        let caps = [fictional_hw_caps(), fictional_tech_caps()];
        for variant in sample_variants() {
            for prop in variant.properties() {
                assert!(caps.iter().any(|c| c.permits(prop)), "{prop}");
            }
        }
    }
}
