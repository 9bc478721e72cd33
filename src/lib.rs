//! Transparent soft delete for bson document stores.
//!
//! Wrap any [`DocumentStore`] in a [`SoftDeleteCollection`]: reads stop returning documents
//! whose `isDeleted` flag is set, aggregations get a not-deleted `$match`, and the collection
//! gains `soft_delete*`, `restore` and unfiltered accessors. [`MemoryCollection`] is an
//! in-process store for embedding and tests.

pub mod config;
pub mod document;
pub mod errors;
pub mod logger;
pub mod memory;
pub mod pipeline;
pub mod query;
pub mod softdelete;
pub mod store;
pub mod telemetry;
pub mod types;

pub use config::{LifecycleStrategy, SoftDeleteConfig};
pub use document::{DELETED_AT, DeletionState, Document, IS_DELETED};
pub use errors::DbError;
pub use memory::MemoryCollection;
pub use pipeline::{Pipeline, Stage};
pub use query::{FindOptions, Query};
pub use softdelete::{BYPASS_FIELD, RestoreReport, SoftDeleteCollection, SoftDeleteReport};
pub use store::{DocumentStore, SaveOptions};
pub use types::DocumentId;

/// Initializes logging from `log4rs.yaml` in the working directory.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::init()?;
    Ok(())
}
