//! Variant resolution.
//!
//! This module turns a candidate set into a ranked list for the current
//! environment. Ranking is pure and deterministic: providers are queried and
//! policies loaded before it starts, and nothing inside it does I/O.

pub mod filter;
pub mod policy;
pub mod resolve;
pub mod session;
pub mod sort;

pub use filter::{ExclusionLists, ExclusionReason, Excluded, Exclusions};
pub use policy::{PolicyWarning, PriorityLists, PriorityPolicy};
pub use resolve::{rank, rank_with_exclusions, Resolution};
pub use session::Session;
pub use sort::SortKey;
