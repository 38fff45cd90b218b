//! High-level operations.
//!
//! This module glues documents, providers, configuration and the resolver
//! together into the calls an installer or build backend makes.

pub mod rank;
pub mod validate;

pub use rank::{rank_variants, RankOptions, RankReport};
pub use validate::{validate_variant, PropertyValidation, ValidationReport};
