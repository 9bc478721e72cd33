use crate::integration_tests::support::{seeded, seeded_with};
use bson::doc;
use chrono::{SubsecRound, Utc};
use nexus_softdelete::softdelete::with_bypass;
use nexus_softdelete::{
    DbError, Document, DocumentId, DocumentStore, FindOptions, Query, RestoreReport, SaveOptions,
    SoftDeleteConfig, SoftDeleteReport,
};

#[tokio::test]
async fn soft_delete_by_id_marks_document() {
    let (col, ids) = seeded("lc_by_id", 2, 0);
    let before = Utc::now().trunc_subsecs(3);
    let report = col.soft_delete_by_id(&ids[0], &SaveOptions::default()).await.unwrap();
    assert_eq!(report, Some(SoftDeleteReport { deleted_count: 1 }));

    let stored = col.inner().find_document(&ids[0]).unwrap();
    assert!(stored.is_deleted());
    assert!(stored.deleted_at().unwrap() >= before);
    assert!(stored.deletion_state().is_consistent());
    assert_eq!(col.count_documents(doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn soft_delete_by_id_unknown_id_is_none() {
    let (col, _) = seeded("lc_by_id_missing", 1, 0);
    let report = col.soft_delete_by_id(&DocumentId::new(), &SaveOptions::default()).await.unwrap();
    assert_eq!(report, None);
}

#[tokio::test]
async fn soft_delete_by_id_on_deleted_document_reports_one_without_writing() {
    let (col, ids) = seeded("lc_by_id_again", 0, 1);
    let original = col.inner().find_document(&ids[0]).unwrap();
    // A save would fail now, so a write attempt would surface as an error.
    col.inner().fail_saves_after(0);
    let report = col.soft_delete_by_id(&ids[0], &SaveOptions::default()).await.unwrap();
    assert_eq!(report, Some(SoftDeleteReport { deleted_count: 1 }));
    assert_eq!(col.inner().find_document(&ids[0]).unwrap(), original);
}

#[tokio::test]
async fn soft_delete_all_counts_only_active() {
    let (col, _) = seeded("lc_all", 3, 2);
    let report = col.soft_delete(doc! {}, &SaveOptions::default()).await.unwrap();
    assert_eq!(report.deleted_count, 3);
    assert!(col.inner().get_all_documents().iter().all(|d| d.is_deleted()));
    assert_eq!(col.find(Query::new(doc! {})).await.unwrap().len(), 0);
}

#[tokio::test]
async fn soft_delete_with_bypass_skips_already_deleted() {
    let (col, _) = seeded("lc_bypass", 2, 2);
    let report = col.soft_delete(with_bypass(doc! {}), &SaveOptions::default()).await.unwrap();
    assert_eq!(report.deleted_count, 2);
}

#[tokio::test]
async fn soft_delete_many_matches_soft_delete() {
    let (col, _) = seeded("lc_many", 4, 0);
    let report = col.soft_delete_many(doc! { "n": { "$lt": 2 } }, &SaveOptions::default()).await.unwrap();
    assert_eq!(report.deleted_count, 2);
    assert_eq!(col.count_documents(doc! {}).await.unwrap(), 2);
}

#[tokio::test]
async fn soft_delete_is_idempotent() {
    let (col, _) = seeded("lc_idem", 3, 0);
    let opts = SaveOptions::default();
    assert_eq!(col.soft_delete(doc! {}, &opts).await.unwrap().deleted_count, 3);
    assert_eq!(col.soft_delete(doc! {}, &opts).await.unwrap().deleted_count, 0);
}

#[tokio::test]
async fn soft_delete_of_nothing_is_zero() {
    let (col, _) = seeded("lc_empty", 0, 0);
    assert_eq!(col.soft_delete(doc! {}, &SaveOptions::default()).await.unwrap().deleted_count, 0);
    assert_eq!(col.restore(doc! {}).await.unwrap(), RestoreReport { restored: 0 });
}

#[tokio::test]
async fn restore_all_deleted() {
    let (col, _) = seeded("lc_restore", 0, 4);
    let report = col.restore(doc! {}).await.unwrap();
    assert_eq!(report.restored, 4);
    for d in col.inner().get_all_documents() {
        assert!(!d.is_deleted());
        assert_eq!(d.data.get("deletedAt"), Some(&bson::Bson::Null));
    }
}

#[tokio::test]
async fn restore_respects_caller_criteria() {
    let (col, _) = seeded("lc_restore_some", 1, 3);
    let report = col.restore(doc! { "n": { "$gte": 3 } }).await.unwrap();
    assert_eq!(report.restored, 2);
    assert_eq!(col.count_documents(doc! {}).await.unwrap(), 3);
}

#[tokio::test]
async fn delete_then_restore_round_trip() {
    let (col, ids) = seeded("lc_round_trip", 3, 0);
    let opts = SaveOptions::default();
    let query = Query::new(doc! { "n": 1_i64 });
    let original = col.find(query.clone()).await.unwrap();
    assert_eq!(col.soft_delete(query.clone(), &opts).await.unwrap().deleted_count, 1);
    assert!(col.find(query.clone()).await.unwrap().is_empty());
    assert_eq!(col.restore(query.clone()).await.unwrap().restored, 1);
    let back = col.find(query).await.unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].id, ids[1]);
    assert_eq!(back[0].data, original[0].data);
}

#[tokio::test]
async fn persist_failure_aborts_bulk_soft_delete() {
    let (col, _) = seeded("lc_persist_fail", 4, 0);
    col.inner().fail_saves_after(1);
    let err = col.soft_delete(doc! {}, &SaveOptions::default()).await.unwrap_err();
    assert!(matches!(err, DbError::Store(_)));
    let deleted = col.inner().get_all_documents().iter().filter(|d| d.is_deleted()).count();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn restore_fetch_failure_propagates() {
    let (col, _) = seeded("lc_restore_fail", 0, 2);
    col.inner().fail_next_find();
    let err = col.restore(doc! {}).await.unwrap_err();
    assert!(matches!(err, DbError::Store(_)));
    assert!(col.inner().get_all_documents().iter().all(|d| d.is_deleted()));
}

#[tokio::test]
async fn invalid_criteria_surfaces_as_query_error() {
    let (col, _) = seeded("lc_bad_query", 1, 0);
    let err = col.soft_delete(doc! { "n": { "$regex": "x" } }, &SaveOptions::default()).await.unwrap_err();
    assert!(matches!(err, DbError::QueryError(_)));
}

#[tokio::test]
async fn concurrent_persists_transition_everything() {
    let cfg = SoftDeleteConfig { persist_concurrency: 4, ..SoftDeleteConfig::default() };
    let (col, _) = seeded_with("lc_concurrent", 25, 5, cfg);
    let report = col.soft_delete(doc! {}, &SaveOptions::default()).await.unwrap();
    assert_eq!(report.deleted_count, 25);
    assert_eq!(col.find_deleted().await.unwrap().len(), 30);
    assert_eq!(col.restore(doc! {}).await.unwrap().restored, 30);
}

#[tokio::test]
async fn report_serializes_with_deleted_count_key() {
    let json = serde_json::to_value(SoftDeleteReport { deleted_count: 3 }).unwrap();
    assert_eq!(json, serde_json::json!({ "deletedCount": 3 }));
}

fn projected(fields: &[&str]) -> Query {
    let opts = FindOptions {
        projection: Some(fields.iter().map(|f| (*f).to_string()).collect()),
        ..FindOptions::default()
    };
    Query::new(doc! {}).with_options(opts)
}

#[tokio::test]
async fn projected_soft_delete_keeps_unprojected_fields() {
    let (col, _) = seeded("lc_projected_delete", 0, 0);
    let id = col
        .inner()
        .insert_document(Document::new(doc! { "n": 1, "kind": "live", "payload": "keep me" }));
    let report = col.soft_delete(projected(&["n"]), &SaveOptions::default()).await.unwrap();
    assert_eq!(report.deleted_count, 1);

    let stored = col.inner().find_document(&id).unwrap();
    assert!(stored.is_deleted());
    assert_eq!(stored.data.get_str("payload").unwrap(), "keep me");
    assert_eq!(stored.data.get_str("kind").unwrap(), "live");
}

#[tokio::test]
async fn projected_bypass_soft_delete_does_not_recount_deleted() {
    let (col, ids) = seeded("lc_projected_bypass", 1, 1);
    let before = col.inner().find_document(&ids[1]).unwrap();
    let mut query = projected(&["n"]);
    query.criteria = with_bypass(doc! {});
    let report = col.soft_delete(query, &SaveOptions::default()).await.unwrap();
    assert_eq!(report.deleted_count, 1);
    assert_eq!(col.inner().find_document(&ids[1]).unwrap().deleted_at(), before.deleted_at());
}

#[tokio::test]
async fn projected_restore_keeps_unprojected_fields() {
    let (col, ids) = seeded("lc_projected_restore", 0, 2);
    let report = col.restore(projected(&["n"])).await.unwrap();
    assert_eq!(report.restored, 2);
    for id in &ids {
        let stored = col.inner().find_document(id).unwrap();
        assert!(!stored.is_deleted());
        assert_eq!(stored.data.get_str("kind").unwrap(), "gone");
    }
}
