//! Variant sources.
//!
//! Sources turn published metadata into candidate variants, provider
//! metadata and the package author's default priorities.

pub mod variants_json;

pub use variants_json::{VariantsJson, VARIANTS_JSON_FILENAME};
