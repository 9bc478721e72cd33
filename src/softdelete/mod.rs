//! The soft-delete layer: read interception, pipeline rewriting and the lifecycle operations.

mod collection;
pub mod filter;
mod lifecycle;
pub mod rewrite;

pub use collection::{FILTER_TARGET, SoftDeleteCollection};
pub use filter::{BYPASS_FIELD, FilterDecision, apply_not_deleted_filter, with_bypass};
pub use lifecycle::{RestoreReport, SoftDeleteReport};
pub use rewrite::{inject_not_deleted_stage, not_deleted_stage};
