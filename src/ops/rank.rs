//! Ranking the variants of a published document.
//!
//! This is the end-to-end path: evaluate provider markers, query the
//! providers, layer priorities, then rank.

use crate::core::marker::Environment;
use crate::core::name::Name;
use crate::core::provider::{
    query_capabilities, CapabilityProvider, ProviderCapabilitySet, ProviderInfo,
};
use crate::errors::{Result, VariantError};
use crate::resolver::policy::PriorityLists;
use crate::resolver::resolve::Resolution;
use crate::resolver::session::Session;
use crate::sources::VariantsJson;
use crate::util::config::Config;

/// Options for [`rank_variants`].
#[derive(Debug, Clone, Default)]
pub struct RankOptions {
    /// Caller-supplied priorities; they take precedence over everything.
    pub overrides: PriorityLists,

    /// User configuration, usually from [`load_config`](crate::util::config::load_config).
    pub config: Config,

    /// Environment `enable-if` markers are evaluated against.
    pub environment: Environment,
}

/// Result of ranking a document.
#[derive(Debug, Clone)]
pub struct RankReport {
    pub resolution: Resolution,

    /// Providers disabled by their `enable-if` marker.
    pub inactive: Vec<Name>,

    /// Optional providers that were missing or failed and were left out.
    pub skipped: Vec<Name>,

    /// Install requirements of the providers that took part.
    pub requirements: Vec<String>,
}

/// Rank every variant of `doc` for this environment.
///
/// Providers are looked up in `providers` by namespace. A missing or failing
/// provider is an error unless the document marks it optional, in which case
/// it is skipped and its variants become incompatible.
pub fn rank_variants(
    doc: &VariantsJson,
    providers: &[&dyn CapabilityProvider],
    opts: &RankOptions,
) -> Result<RankReport> {
    let namespaces: Vec<Name> = if doc.providers().is_empty() {
        doc.namespaces()
    } else {
        doc.providers().keys().copied().collect()
    };

    let mut capabilities = Vec::with_capacity(namespaces.len());
    let mut inactive = Vec::new();
    let mut skipped = Vec::new();

    for namespace in namespaces {
        let info = doc.providers().get(&namespace).cloned().unwrap_or_default();

        if let Some(marker) = &info.enable_if {
            if !marker.evaluate(&opts.environment)? {
                tracing::info!("Provider `{}` disabled by `{}`", namespace, marker);
                inactive.push(namespace);
                continue;
            }
        }

        match query_one(namespace, providers, info.clone()) {
            Ok(caps) => capabilities.push(caps),
            Err(e) if info.optional => {
                tracing::warn!("Skipping optional provider `{}`: {}", namespace, e);
                skipped.push(namespace);
            }
            Err(e) => return Err(e),
        }
    }

    let lists = opts
        .overrides
        .overlay(&opts.config.priorities)
        .overlay(doc.default_priorities());

    let session = Session::new(capabilities, &opts.environment, &lists)?
        .with_exclusions(opts.config.exclusions()?);
    let resolution = session.rank(&doc.candidates())?;

    Ok(RankReport {
        requirements: session.requirements().into_iter().map(String::from).collect(),
        resolution,
        inactive,
        skipped,
    })
}

fn query_one(
    namespace: Name,
    providers: &[&dyn CapabilityProvider],
    info: ProviderInfo,
) -> Result<ProviderCapabilitySet> {
    let provider = providers
        .iter()
        .find(|p| p.namespace() == namespace.as_str())
        .ok_or_else(|| VariantError::provider_query(namespace.as_str(), "no provider is installed"))?;
    query_capabilities(*provider, info)
}
