use super::aggregate::run_pipeline;
use super::core::MemoryCollection;
use crate::document::Document;
use crate::errors::DbError;
use crate::pipeline::Pipeline;
use crate::query::{
    FindOptions, MAX_LIMIT, MAX_PROJECTION_FIELDS, Query, UpdateDoc, UpdateReport, apply_update,
    compare_docs, compile_criteria, eval_filter, project_fields,
};
use crate::store::{DocumentStore, SaveOptions};
use crate::types::DocumentId;
use async_trait::async_trait;
use bson::Document as BsonDocument;
use std::time::{Duration, Instant};

impl MemoryCollection {
    fn take_find_fault(&self) -> Result<(), DbError> {
        let mut faults = self.faults.lock();
        if std::mem::take(&mut faults.fail_next_find) {
            return Err(DbError::Store(format!("{}: find failed", self.name_str())));
        }
        Ok(())
    }

    fn take_save_fault(&self) -> Result<(), DbError> {
        let mut faults = self.faults.lock();
        match faults.saves_before_failure.as_mut() {
            Some(0) => Err(DbError::Store(format!("{}: save failed", self.name_str()))),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn select(&self, criteria: &BsonDocument, opts: &FindOptions) -> Result<Vec<Document>, DbError> {
        self.take_find_fault()?;
        let filter = compile_criteria(criteria)?;
        let deadline = opts.timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        let mut docs = Vec::new();
        {
            let inner = self.inner.read();
            for d in inner.ordered() {
                if let Some(dl) = deadline
                    && Instant::now() > dl
                {
                    return Err(DbError::QueryError("timeout".into()));
                }
                if eval_filter(&d.to_bson(), &filter) {
                    docs.push(d.clone());
                }
            }
        }

        if let Some(sort) = &opts.sort {
            docs.sort_by(|a, b| compare_docs(&a.to_bson(), &b.to_bson(), sort));
        }

        let skip = opts.skip.unwrap_or(0);
        let limit = opts.limit.map_or(usize::MAX, |l| l.min(MAX_LIMIT));
        let mut docs: Vec<Document> = docs.into_iter().skip(skip).take(limit).collect();

        if let Some(fields) = &opts.projection {
            let fields: Vec<String> = fields.iter().take(MAX_PROJECTION_FIELDS).cloned().collect();
            for d in &mut docs {
                d.data = project_fields(&d.data, &fields);
            }
        }
        log::debug!("{}: find matched {} document(s)", self.name_str(), docs.len());
        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for MemoryCollection {
    fn name(&self) -> String {
        self.name_str().to_string()
    }

    async fn find(&self, query: Query) -> Result<Vec<Document>, DbError> {
        self.select(&query.criteria, &query.options)
    }

    async fn find_one(&self, query: Query) -> Result<Option<Document>, DbError> {
        let mut opts = query.options;
        opts.limit = Some(1);
        Ok(self.select(&query.criteria, &opts)?.into_iter().next())
    }

    async fn count_documents(&self, criteria: BsonDocument) -> Result<u64, DbError> {
        let filter = compile_criteria(&criteria)?;
        let n = self.inner.read().ordered().filter(|d| eval_filter(&d.to_bson(), &filter)).count();
        Ok(n as u64)
    }

    async fn aggregate(&self, pipeline: Pipeline) -> Result<Vec<BsonDocument>, DbError> {
        let input: Vec<BsonDocument> = self.inner.read().ordered().map(Document::to_bson).collect();
        run_pipeline(input, &pipeline)
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, DbError> {
        Ok(self.find_document(id))
    }

    async fn insert_one(&self, document: Document) -> Result<DocumentId, DbError> {
        if self.inner.read().docs.contains_key(&document.id) {
            return Err(DbError::Store(format!("{}: duplicate id {}", self.name_str(), document.id)));
        }
        Ok(self.insert_document(document))
    }

    async fn save(&self, document: &Document, options: &SaveOptions) -> Result<(), DbError> {
        if !options.skip_validation && !document.deletion_state().is_consistent() {
            return Err(DbError::Validation(format!(
                "document {}: isDeleted and deletedAt disagree",
                document.id
            )));
        }
        self.take_save_fault()?;
        self.insert_document(document.clone());
        Ok(())
    }

    async fn update_many(
        &self,
        criteria: BsonDocument,
        update: UpdateDoc,
    ) -> Result<UpdateReport, DbError> {
        let filter = compile_criteria(&criteria)?;
        let mut report = UpdateReport::default();
        // Match and write under one lock so the update is atomic for readers.
        let mut inner = self.inner.write();
        let ids = inner.order.clone();
        for id in ids {
            if let Some(doc) = inner.docs.get_mut(&id)
                && eval_filter(&doc.to_bson(), &filter)
            {
                report.matched += 1;
                if apply_update(doc, &update) {
                    report.modified += 1;
                }
            }
        }
        Ok(report)
    }
}
