//! Not-deleted filter injection for find, find-one and count criteria.

use crate::document::IS_DELETED;
use crate::query::truthy;
use bson::{Bson, Document as BsonDocument, doc};

/// Reserved pseudo-field asking the interceptor to skip injection for one call.
/// It is never a document field and is always stripped before the store sees the criteria.
pub const BYPASS_FIELD: &str = "fetchAllIncludingSoftDeletedRecords";

/// Which branch the injector took for a given criteria document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// The bypass pseudo-field was present; criteria run as given.
    Bypassed,
    /// The caller already constrains `isDeleted`; criteria run as given.
    CallerConstrained,
    /// `isDeleted: { $ne: true }` was added.
    Injected,
}

/// `{ $ne: true }` rather than `false` equality, so documents lacking the field count as active.
#[must_use]
pub fn not_deleted_constraint() -> Bson {
    Bson::Document(doc! { "$ne": true })
}

/// Rewrite `criteria` in place into the criteria to execute.
pub fn apply_not_deleted_filter(criteria: &mut BsonDocument) -> FilterDecision {
    if let Some(flag) = criteria.remove(BYPASS_FIELD)
        && truthy(&flag)
    {
        return FilterDecision::Bypassed;
    }
    if criteria.contains_key(IS_DELETED) {
        return FilterDecision::CallerConstrained;
    }
    criteria.insert(IS_DELETED, not_deleted_constraint());
    FilterDecision::Injected
}

/// Tag `criteria` with the bypass pseudo-field.
#[must_use]
pub fn with_bypass(mut criteria: BsonDocument) -> BsonDocument {
    criteria.insert(BYPASS_FIELD, true);
    criteria
}
