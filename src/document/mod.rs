pub mod core;
pub mod types;

pub use core::Document;
pub use types::{DELETED_AT, DeletionState, IS_DELETED, Metadata, deleted_at_bson};
