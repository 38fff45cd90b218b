//! Test utilities for variantlib unit tests.
//!
//! This module provides the fictional providers and variant sets used across
//! the resolver, source and ops tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::test_support::fixtures;
//!
//! #[test]
//! fn test_example() {
//!     let doc = fixtures::sample_document();
//!     let hw = fixtures::fictional_hw_provider();
//!     let tech = fixtures::fictional_tech_provider();
//!     // rank doc against hw and tech...
//! }
//! ```

pub mod fixtures;

pub use fixtures::*;
