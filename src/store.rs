//! Capability contract between the soft-delete layer and a document store.

use crate::document::Document;
use crate::errors::DbError;
use crate::pipeline::Pipeline;
use crate::query::{Query, UpdateDoc, UpdateReport};
use crate::types::DocumentId;
use async_trait::async_trait;
use bson::Document as BsonDocument;
use serde::{Deserialize, Serialize};

/// Write options forwarded untouched to `DocumentStore::save`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOptions {
    /// Skip store-side validation of the document before writing.
    #[serde(default)]
    pub skip_validation: bool,
}

/// Operations a collection must offer. `SoftDeleteCollection` both consumes and implements
/// this trait, so decorated and raw collections are interchangeable.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Collection name, used for logs and audit lines.
    fn name(&self) -> String;

    async fn find(&self, query: Query) -> Result<Vec<Document>, DbError>;

    async fn find_one(&self, query: Query) -> Result<Option<Document>, DbError>;

    async fn count_documents(&self, criteria: BsonDocument) -> Result<u64, DbError>;

    async fn aggregate(&self, pipeline: Pipeline) -> Result<Vec<BsonDocument>, DbError>;

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, DbError>;

    async fn insert_one(&self, document: Document) -> Result<DocumentId, DbError>;

    /// Persist the full document under its id.
    async fn save(&self, document: &Document, options: &SaveOptions) -> Result<(), DbError>;

    /// Apply `update` to every document matching `criteria` as one store-side operation.
    async fn update_many(
        &self,
        criteria: BsonDocument,
        update: UpdateDoc,
    ) -> Result<UpdateReport, DbError>;
}
