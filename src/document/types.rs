use bson::{Bson, Document as BsonDocument};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Persisted flag marking a document as logically deleted.
pub const IS_DELETED: &str = "isDeleted";
/// Persisted timestamp of the last soft delete; `null` while active.
pub const DELETED_AT: &str = "deletedAt";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self { created_at: now, updated_at: now }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Deletion state carried in every managed document.
///
/// `is_deleted == false` must coincide with `deleted_at == None`. The transition methods keep
/// both fields in step; nothing derives one from the other.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeletionState {
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DeletionState {
    #[must_use]
    pub const fn active() -> Self {
        Self { is_deleted: false, deleted_at: None }
    }

    /// Move to the deleted state. Returns `false` (and changes nothing) when already deleted.
    pub fn mark_deleted(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_deleted {
            return false;
        }
        self.is_deleted = true;
        self.deleted_at = Some(at.trunc_subsecs(3));
        true
    }

    /// Move back to the active state. Returns `false` when the document was not deleted.
    pub fn restore(&mut self) -> bool {
        if !self.is_deleted {
            return false;
        }
        self.is_deleted = false;
        self.deleted_at = None;
        true
    }

    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.is_deleted == self.deleted_at.is_some()
    }

    /// Read the state from a document body. Missing or non-boolean `isDeleted` reads as active
    /// so that legacy documents stay visible.
    #[must_use]
    pub fn from_bson(doc: &BsonDocument) -> Self {
        let is_deleted = matches!(doc.get(IS_DELETED), Some(Bson::Boolean(true)));
        let deleted_at = match doc.get(DELETED_AT) {
            Some(Bson::DateTime(dt)) => DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()),
            _ => None,
        };
        Self { is_deleted, deleted_at }
    }

    pub fn write_to(&self, doc: &mut BsonDocument) {
        doc.insert(IS_DELETED, self.is_deleted);
        doc.insert(DELETED_AT, deleted_at_bson(self.deleted_at));
    }

    /// Fill in the defaults (`isDeleted: false`, `deletedAt: null`) for any missing field.
    pub fn apply_defaults(doc: &mut BsonDocument) {
        if !doc.contains_key(IS_DELETED) {
            doc.insert(IS_DELETED, false);
        }
        if !doc.contains_key(DELETED_AT) {
            doc.insert(DELETED_AT, Bson::Null);
        }
    }
}

#[must_use]
pub fn deleted_at_bson(at: Option<DateTime<Utc>>) -> Bson {
    at.map_or(Bson::Null, |t| Bson::DateTime(bson::DateTime::from_millis(t.timestamp_millis())))
}
