//! Soft delete and restore.

use super::collection::SoftDeleteCollection;
use super::filter::BYPASS_FIELD;
use crate::config::LifecycleStrategy;
use crate::document::{DELETED_AT, Document, IS_DELETED, deleted_at_bson};
use crate::errors::DbError;
use crate::query::{Query, UpdateDoc};
use crate::store::{DocumentStore, SaveOptions};
use crate::telemetry::{self, AuditOp};
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument, doc};
use chrono::{SubsecRound, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDeleteReport {
    #[serde(rename = "deletedCount")]
    pub deleted_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub restored: u64,
}

/// Candidates are saved back in full, so they must be fetched unprojected.
fn whole_documents(mut query: Query) -> Query {
    query.options.projection = None;
    query
}

impl<S: DocumentStore> SoftDeleteCollection<S> {
    /// Soft-delete one document by id, looked up without the not-deleted filter.
    ///
    /// Returns `Ok(None)` when no document has that id. A document that is already deleted is
    /// left untouched and still reported with `deleted_count == 1`.
    ///
    /// # Errors
    /// Propagates store errors from the lookup or the save.
    pub async fn soft_delete_by_id(
        &self,
        id: &DocumentId,
        options: &SaveOptions,
    ) -> Result<Option<SoftDeleteReport>, DbError> {
        let Some(mut document) = self.inner.find_by_id(id).await? else {
            return Ok(None);
        };
        if document.mark_deleted(Utc::now()) {
            self.persist_one(&document, options, AuditOp::SoftDelete).await?;
        }
        Ok(Some(SoftDeleteReport { deleted_count: 1 }))
    }

    /// Soft-delete every active document matching `query`. The fetch goes through the
    /// intercepted `find`, so the bypass pseudo-field and explicit `isDeleted` criteria behave
    /// as they do for reads.
    ///
    /// # Errors
    /// Propagates the first store error; the partial count is discarded.
    pub async fn soft_delete(
        &self,
        query: impl Into<Query> + Send,
        options: &SaveOptions,
    ) -> Result<SoftDeleteReport, DbError> {
        let query = whole_documents(query.into());
        let now = Utc::now();
        let deleted_count = match self.config.strategy {
            LifecycleStrategy::FetchThenSave => {
                let candidates: Vec<Document> = self
                    .find(query)
                    .await?
                    .into_iter()
                    .filter_map(|mut d| d.mark_deleted(now).then_some(d))
                    .collect();
                self.persist_all(candidates, options, AuditOp::SoftDelete).await?
            }
            LifecycleStrategy::ConditionalUpdate => {
                let update = UpdateDoc {
                    set: vec![
                        (IS_DELETED.to_string(), Bson::Boolean(true)),
                        (DELETED_AT.to_string(), deleted_at_bson(Some(now.trunc_subsecs(3)))),
                    ],
                    unset: Vec::new(),
                };
                self.conditional(query.criteria, update, AuditOp::SoftDelete).await?
            }
        };
        Ok(SoftDeleteReport { deleted_count })
    }

    /// Same contract as `soft_delete`.
    ///
    /// # Errors
    /// Propagates the first store error.
    pub async fn soft_delete_many(
        &self,
        query: impl Into<Query> + Send,
        options: &SaveOptions,
    ) -> Result<SoftDeleteReport, DbError> {
        self.soft_delete(query, options).await
    }

    /// Restore every soft-deleted document matching `query`.
    ///
    /// # Errors
    /// Propagates store errors from the fetch or any save.
    pub async fn restore(&self, query: impl Into<Query> + Send) -> Result<RestoreReport, DbError> {
        let mut query = whole_documents(query.into());
        let restored = match self.config.strategy {
            LifecycleStrategy::FetchThenSave => {
                query.criteria.insert(IS_DELETED, true);
                let candidates: Vec<Document> = self
                    .find(query)
                    .await?
                    .into_iter()
                    .filter_map(|mut d| d.restore().then_some(d))
                    .collect();
                self.persist_all(candidates, &SaveOptions::default(), AuditOp::Restore).await?
            }
            LifecycleStrategy::ConditionalUpdate => {
                let update = UpdateDoc {
                    set: vec![
                        (IS_DELETED.to_string(), Bson::Boolean(false)),
                        (DELETED_AT.to_string(), Bson::Null),
                    ],
                    unset: Vec::new(),
                };
                self.conditional(query.criteria, update, AuditOp::Restore).await?
            }
        };
        Ok(RestoreReport { restored })
    }

    async fn persist_one(
        &self,
        document: &Document,
        options: &SaveOptions,
        op: AuditOp,
    ) -> Result<(), DbError> {
        let name = self.inner.name();
        if let Err(e) = self.inner.save(document, options).await {
            log::warn!("{name}: {} of {} failed: {e}", op.as_str(), document.id);
            return Err(e);
        }
        telemetry::record_transitions(op, 1);
        if self.config.audit {
            telemetry::log_audit(op, &name, &document.id.to_string());
        }
        Ok(())
    }

    /// Save already-transitioned documents, at most `persist_concurrency` at a time, stopping
    /// at the first failure.
    async fn persist_all(
        &self,
        candidates: Vec<Document>,
        options: &SaveOptions,
        op: AuditOp,
    ) -> Result<u64, DbError> {
        let width = self.config.effective_concurrency();
        stream::iter(candidates)
            .map(move |document| async move { self.persist_one(&document, options, op).await })
            .buffer_unordered(width)
            .try_fold(0u64, |n, ()| async move { Ok::<_, DbError>(n + 1) })
            .await
    }

    /// One store-side update over `criteria` restricted to documents in the source state
    /// (active for a soft delete, deleted for a restore). Returns the number modified.
    async fn conditional(
        &self,
        mut criteria: BsonDocument,
        update: UpdateDoc,
        op: AuditOp,
    ) -> Result<u64, DbError> {
        criteria.remove(BYPASS_FIELD);
        let mut guard = BsonDocument::new();
        match op {
            AuditOp::SoftDelete => guard.insert(IS_DELETED, doc! { "$ne": true }),
            AuditOp::Restore => guard.insert(IS_DELETED, true),
        };
        let guarded = if criteria.is_empty() {
            guard
        } else {
            doc! { "$and": [criteria, guard] }
        };
        let name = self.inner.name();
        let report = self.inner.update_many(guarded, update).await?;
        telemetry::record_transitions(op, report.modified);
        if self.config.audit && report.modified > 0 {
            telemetry::log_audit(op, &name, &format!("*{}", report.modified));
        }
        Ok(report.modified)
    }
}
