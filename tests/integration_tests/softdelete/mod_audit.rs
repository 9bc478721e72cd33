use crate::integration_tests::support::{audit_sink, seeded};
use bson::doc;
use nexus_softdelete::telemetry::metrics_text;
use nexus_softdelete::{SaveOptions, SoftDeleteCollection, SoftDeleteConfig};

fn metric(name: &str) -> u64 {
    metrics_text()
        .lines()
        .find_map(|l| l.strip_prefix(name).map(|v| v.trim().parse().unwrap()))
        .unwrap()
}

#[tokio::test]
async fn transitions_emit_audit_lines_and_counters() {
    let sink = audit_sink();
    let before_deleted = metric("softdelete_soft_deleted_total ");
    let before_restored = metric("softdelete_restored_total ");

    let (col, ids) = seeded("audit_events_col", 2, 0);
    col.soft_delete(doc! {}, &SaveOptions::default()).await.unwrap();
    col.restore(doc! { "n": 0_i64 }).await.unwrap();

    let lines: Vec<serde_json::Value> = sink
        .read()
        .iter()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .filter(|v| v["collection"] == "audit_events_col")
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines.iter().filter(|v| v["op"] == "soft_delete").count(), 2);
    let restore = lines.iter().find(|v| v["op"] == "restore").unwrap();
    assert_eq!(restore["doc_id"], ids[0].to_string());

    assert!(metric("softdelete_soft_deleted_total ") >= before_deleted + 2);
    assert!(metric("softdelete_restored_total ") >= before_restored + 1);
}

#[tokio::test]
async fn audit_can_be_disabled() {
    let sink = audit_sink();
    let (col, _) = seeded("audit_quiet_col", 2, 0);
    let col = SoftDeleteCollection::with_config(
        col.into_inner(),
        SoftDeleteConfig { audit: false, ..SoftDeleteConfig::default() },
    );
    col.soft_delete(doc! {}, &SaveOptions::default()).await.unwrap();
    assert!(!sink.read().iter().any(|l| l.contains("audit_quiet_col")));
}
