//! Error taxonomy for variant parsing, policy construction and resolution.
//!
//! Every variant is fatal to the call that produced it. Non-fatal conditions
//! (unused policy entries, excluded candidates) are reported as data on the
//! [`Resolution`](crate::resolver::Resolution) instead.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Result alias used throughout the engine.
pub type Result<T, E = VariantError> = std::result::Result<T, E>;

/// Error raised by the variant engine.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum VariantError {
    #[error("invalid {kind} `{value}`: only ASCII letters, digits, `_` and `-` are allowed")]
    #[diagnostic(code(variantlib::property::invalid_identifier))]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("empty value for `{namespace} :: {feature}`")]
    #[diagnostic(code(variantlib::property::empty_value))]
    EmptyValue { namespace: String, feature: String },

    #[error("invalid value `{value}`: {reason}")]
    #[diagnostic(code(variantlib::property::invalid_value))]
    InvalidValue { value: String, reason: &'static str },

    #[error("malformed key `{input}`, expected `{expected}`")]
    #[diagnostic(code(variantlib::property::malformed_key))]
    MalformedKey { input: String, expected: &'static str },

    #[error("feature `{namespace} :: {feature}` is declared more than once")]
    #[diagnostic(code(variantlib::variant::duplicate_feature))]
    DuplicateFeature { namespace: String, feature: String },

    #[error("configuration error: {message}")]
    #[diagnostic(code(variantlib::policy::configuration))]
    Configuration { message: String },

    #[error("provider `{provider}` failed: {message}")]
    #[diagnostic(code(variantlib::provider::query))]
    ProviderQuery { provider: String, message: String },

    #[error("invalid enable-if marker `{marker}`: {message}")]
    #[diagnostic(code(variantlib::provider::invalid_marker))]
    InvalidMarker { marker: String, message: String },

    #[error("variant `{declared}` does not match its properties (computed `{computed}`)")]
    #[diagnostic(code(variantlib::variant::identifier_mismatch))]
    IdentifierMismatch { declared: String, computed: String },

    #[error("two different variants share the identifier `{identifier}`")]
    #[diagnostic(code(variantlib::variant::identifier_collision))]
    IdentifierCollision { identifier: String },

    #[error("malformed variant record: {message}")]
    #[diagnostic(code(variantlib::source::malformed_record))]
    MalformedRecord { message: String },

    #[error("none of the {candidates} candidate variants is compatible with this environment")]
    #[diagnostic(code(variantlib::resolve::no_compatible_variant))]
    NoCompatibleVariant {
        candidates: usize,
        /// One line per excluded candidate: `<identifier>: <reason>`.
        excluded: Vec<String>,
    },
}

impl VariantError {
    /// Build a configuration error from any message.
    pub fn configuration(message: impl Into<String>) -> Self {
        VariantError::Configuration {
            message: message.into(),
        }
    }

    /// Build a provider query error for the given provider.
    pub fn provider_query(provider: impl Into<String>, message: impl Into<String>) -> Self {
        VariantError::ProviderQuery {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            VariantError::InvalidIdentifier { .. } | VariantError::MalformedKey { .. } => {
                Diagnostic::error(self.to_string())
                    .with_suggestion("Write keys as `namespace :: feature :: value`")
            }

            VariantError::EmptyValue { .. } | VariantError::InvalidValue { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(
                    "Property values must be non-empty and contain no whitespace or `::`",
                )
            }

            VariantError::DuplicateFeature { .. } => Diagnostic::error(self.to_string())
                .with_context("a variant carries at most one value per feature")
                .with_suggestion("Remove one of the conflicting properties"),

            VariantError::Configuration { .. } => Diagnostic::error(self.to_string())
                .with_suggestion(format!(
                    "List every active provider namespace in `namespace_priorities` ({})",
                    crate::util::config::CONFIG_FILENAME
                )),

            VariantError::ProviderQuery { provider, .. } => Diagnostic::error(self.to_string())
                .with_suggestion(format!(
                    "Check that the plugin providing `{}` is installed and working",
                    provider
                )),

            VariantError::InvalidMarker { .. } => Diagnostic::error(self.to_string())
                .with_suggestion("Use expressions like `python_version >= '3.12'`"),

            VariantError::IdentifierMismatch { .. } | VariantError::IdentifierCollision { .. } => {
                Diagnostic::error(self.to_string())
                    .with_context("the variant metadata is corrupt or has been tampered with")
                    .with_suggestion("Regenerate the variants metadata from the built artifacts")
            }

            VariantError::MalformedRecord { .. } => Diagnostic::error(self.to_string()),

            VariantError::NoCompatibleVariant { excluded, .. } => {
                let mut diag = Diagnostic::error(self.to_string());
                for line in excluded {
                    diag = diag.with_context(line.clone());
                }
                diag.with_suggestion("Publish a null variant as a universal fallback")
            }
        }
    }
}
