//! Contiguous ordering of categories, products and tables.
//!
//! `engine` and `plan` are pure; `coordinator` runs them against the store
//! inside the caller's transaction.

pub mod coordinator;
pub mod engine;
pub mod plan;
pub mod scope;

pub use coordinator::RestoreHint;
pub use engine::OrderedRecord;
pub use scope::{Collection, Scope};
