use crate::integration_tests::support::seeded_with;
use bson::doc;
use nexus_softdelete::softdelete::with_bypass;
use nexus_softdelete::{DocumentStore, LifecycleStrategy, SaveOptions, SoftDeleteConfig};

fn conditional() -> SoftDeleteConfig {
    SoftDeleteConfig { strategy: LifecycleStrategy::ConditionalUpdate, ..SoftDeleteConfig::default() }
}

#[tokio::test]
async fn conditional_soft_delete_counts_modified() {
    let (col, _) = seeded_with("st_delete", 3, 2, conditional());
    let opts = SaveOptions::default();
    assert_eq!(col.soft_delete(doc! {}, &opts).await.unwrap().deleted_count, 3);
    assert_eq!(col.soft_delete(doc! {}, &opts).await.unwrap().deleted_count, 0);
    for d in col.inner().get_all_documents() {
        assert!(d.is_deleted());
        assert!(d.deletion_state().is_consistent());
    }
}

#[tokio::test]
async fn conditional_soft_delete_honours_criteria_and_bypass() {
    let (col, _) = seeded_with("st_criteria", 4, 1, conditional());
    let opts = SaveOptions::default();
    let report = col.soft_delete(with_bypass(doc! { "n": { "$lte": 1 } }), &opts).await.unwrap();
    assert_eq!(report.deleted_count, 2);
    assert_eq!(col.count_documents(doc! {}).await.unwrap(), 2);
}

#[tokio::test]
async fn conditional_restore_ignores_documents_without_flag() {
    let (col, _) = seeded_with("st_restore", 2, 3, conditional());
    let mut legacy = nexus_softdelete::Document::new(doc! { "n": 100 });
    legacy.data.remove("isDeleted");
    col.inner().insert_document(legacy);
    assert_eq!(col.restore(doc! {}).await.unwrap().restored, 3);
    assert_eq!(col.restore(doc! {}).await.unwrap().restored, 0);
    assert_eq!(col.count_documents(doc! {}).await.unwrap(), 6);
}

#[tokio::test]
async fn strategies_agree_on_round_trip() {
    for cfg in [SoftDeleteConfig::default(), conditional()] {
        let (col, _) = seeded_with("st_agree", 3, 1, cfg);
        let opts = SaveOptions::default();
        assert_eq!(col.soft_delete(doc! { "n": 0_i64 }, &opts).await.unwrap().deleted_count, 1);
        assert_eq!(col.count_documents(doc! {}).await.unwrap(), 2);
        assert_eq!(col.restore(doc! {}).await.unwrap().restored, 2);
        assert_eq!(col.count_documents(doc! {}).await.unwrap(), 4);
    }
}
