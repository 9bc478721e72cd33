//! Not-deleted stage injection for aggregation pipelines.

use super::filter::not_deleted_constraint;
use crate::document::IS_DELETED;
use crate::pipeline::Stage;
use bson::Document as BsonDocument;

#[must_use]
pub fn not_deleted_stage() -> Stage {
    let mut criteria = BsonDocument::new();
    criteria.insert(IS_DELETED, not_deleted_constraint());
    Stage::Match(criteria)
}

/// Put the not-deleted `$match` as early as the store allows: right after a leading
/// `$geoNear`, otherwise at the front. Aggregation has no bypass.
pub fn inject_not_deleted_stage(stages: &mut Vec<Stage>) {
    match stages.first() {
        Some(Stage::GeoNear(_)) => stages.insert(1, not_deleted_stage()),
        _ => stages.insert(0, not_deleted_stage()),
    }
}
