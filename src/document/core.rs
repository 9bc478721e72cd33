use crate::document::types::{DeletionState, Metadata};
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: BsonDocument,
    pub metadata: Metadata,
}

impl Document {
    /// Build a new document; the deletion fields get their defaults when absent.
    #[must_use]
    pub fn new(mut data: BsonDocument) -> Self {
        DeletionState::apply_defaults(&mut data);
        Self { id: DocumentId::new(), data, metadata: Metadata::new() }
    }

    #[must_use]
    pub fn deletion_state(&self) -> DeletionState {
        DeletionState::from_bson(&self.data)
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deletion_state().is_deleted
    }

    #[must_use]
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deletion_state().deleted_at
    }

    pub fn set_deletion_state(&mut self, state: &DeletionState) {
        state.write_to(&mut self.data);
        self.metadata.updated_at = Utc::now();
    }

    /// Soft-delete in memory. Returns `false` when the document was already deleted.
    pub fn mark_deleted(&mut self, at: DateTime<Utc>) -> bool {
        let mut state = self.deletion_state();
        if !state.mark_deleted(at) {
            return false;
        }
        self.set_deletion_state(&state);
        true
    }

    /// Restore in memory. Returns `false` when the document was not deleted.
    pub fn restore(&mut self) -> bool {
        let mut state = self.deletion_state();
        if !state.restore() {
            return false;
        }
        self.set_deletion_state(&state);
        true
    }

    /// Body as seen by queries: `_id` first, then the stored fields.
    #[must_use]
    pub fn to_bson(&self) -> BsonDocument {
        let mut out = BsonDocument::new();
        out.insert("_id", Bson::String(self.id.to_string()));
        for (k, v) in &self.data {
            if k != "_id" {
                out.insert(k.clone(), v.clone());
            }
        }
        out
    }
}
