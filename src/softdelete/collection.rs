use super::filter::{FilterDecision, apply_not_deleted_filter, with_bypass};
use super::rewrite::inject_not_deleted_stage;
use crate::config::SoftDeleteConfig;
use crate::document::{DeletionState, Document, IS_DELETED};
use crate::errors::DbError;
use crate::pipeline::Pipeline;
use crate::query::{FindOptions, Query, UpdateDoc, UpdateReport};
use crate::store::{DocumentStore, SaveOptions};
use crate::telemetry;
use crate::types::DocumentId;
use async_trait::async_trait;
use bson::Document as BsonDocument;

pub const FILTER_TARGET: &str = "nexus_softdelete::filter";

/// Decorator that hides soft-deleted documents from every read of the wrapped store and adds
/// the soft-delete lifecycle operations.
///
/// Reads (`find`, `find_one`, `count_documents`) get `isDeleted: { $ne: true }` merged into
/// their criteria unless the caller constrains `isDeleted` or sets the bypass pseudo-field.
/// Aggregations always get a leading not-deleted `$match` (after a leading `$geoNear`).
pub struct SoftDeleteCollection<S> {
    pub(crate) inner: S,
    pub(crate) config: SoftDeleteConfig,
}

impl<S: DocumentStore> SoftDeleteCollection<S> {
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, SoftDeleteConfig::default())
    }

    pub fn with_config(inner: S, config: SoftDeleteConfig) -> Self {
        Self { inner, config }
    }

    /// The wrapped store; reads through it are not filtered.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn config(&self) -> &SoftDeleteConfig {
        &self.config
    }

    fn intercept(&self, op: &str, criteria: &mut BsonDocument) -> FilterDecision {
        let decision = apply_not_deleted_filter(criteria);
        match decision {
            FilterDecision::Injected => telemetry::record_filter_injected(),
            FilterDecision::Bypassed => telemetry::record_filter_bypassed(),
            FilterDecision::CallerConstrained => {}
        }
        log::debug!(target: FILTER_TARGET, "{}: {op} {decision:?}", self.inner.name());
        decision
    }

    /// Every soft-deleted document.
    ///
    /// # Errors
    /// Propagates store errors.
    pub async fn find_deleted(&self) -> Result<Vec<Document>, DbError> {
        let mut criteria = BsonDocument::new();
        criteria.insert(IS_DELETED, true);
        self.find(Query::new(criteria)).await
    }

    /// `find` with soft-deleted documents included. A `Some` projection replaces the one in
    /// `options`.
    ///
    /// # Errors
    /// Propagates store errors.
    pub async fn find_all_including_soft_deleted(
        &self,
        criteria: BsonDocument,
        projection: Option<Vec<String>>,
        options: Option<FindOptions>,
    ) -> Result<Vec<Document>, DbError> {
        self.find(bypass_query(criteria, projection, options)).await
    }

    /// `find_one` with soft-deleted documents included.
    ///
    /// # Errors
    /// Propagates store errors.
    pub async fn find_one_including_soft_deleted(
        &self,
        criteria: BsonDocument,
        projection: Option<Vec<String>>,
        options: Option<FindOptions>,
    ) -> Result<Option<Document>, DbError> {
        self.find_one(bypass_query(criteria, projection, options)).await
    }
}

fn bypass_query(
    criteria: BsonDocument,
    projection: Option<Vec<String>>,
    options: Option<FindOptions>,
) -> Query {
    let mut options = options.unwrap_or_default();
    if projection.is_some() {
        options.projection = projection;
    }
    Query::new(with_bypass(criteria)).with_options(options)
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for SoftDeleteCollection<S> {
    fn name(&self) -> String {
        self.inner.name()
    }

    async fn find(&self, mut query: Query) -> Result<Vec<Document>, DbError> {
        self.intercept("find", &mut query.criteria);
        self.inner.find(query).await
    }

    async fn find_one(&self, mut query: Query) -> Result<Option<Document>, DbError> {
        self.intercept("find_one", &mut query.criteria);
        self.inner.find_one(query).await
    }

    async fn count_documents(&self, mut criteria: BsonDocument) -> Result<u64, DbError> {
        self.intercept("count_documents", &mut criteria);
        self.inner.count_documents(criteria).await
    }

    async fn aggregate(&self, mut pipeline: Pipeline) -> Result<Vec<BsonDocument>, DbError> {
        inject_not_deleted_stage(&mut pipeline.stages);
        telemetry::record_aggregation_rewritten();
        log::debug!(
            target: FILTER_TARGET,
            "{}: aggregate rewritten to {} stage(s)",
            self.inner.name(),
            pipeline.len()
        );
        self.inner.aggregate(pipeline).await
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, DbError> {
        self.inner.find_by_id(id).await
    }

    async fn insert_one(&self, mut document: Document) -> Result<DocumentId, DbError> {
        DeletionState::apply_defaults(&mut document.data);
        self.inner.insert_one(document).await
    }

    async fn save(&self, document: &Document, options: &SaveOptions) -> Result<(), DbError> {
        self.inner.save(document, options).await
    }

    async fn update_many(
        &self,
        criteria: BsonDocument,
        update: UpdateDoc,
    ) -> Result<UpdateReport, DbError> {
        self.inner.update_many(criteria, update).await
    }
}
