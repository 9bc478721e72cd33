//! Process-wide counters and the audit trail for soft-delete transitions.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const AUDIT_TARGET: &str = "nexus_softdelete::audit";

#[derive(Default)]
pub struct Metrics {
    pub filters_injected_total: AtomicU64,
    pub filters_bypassed_total: AtomicU64,
    pub soft_deleted_total: AtomicU64,
    pub restored_total: AtomicU64,
    pub aggregations_rewritten_total: AtomicU64,
}

#[derive(Default)]
pub struct Telemetry {
    pub metrics: Metrics,
    // For tests we can capture audit lines in-memory
    audit_sink: RwLock<Option<Arc<RwLock<Vec<String>>>>>,
}

pub(crate) static TELEMETRY: std::sync::LazyLock<Telemetry> =
    std::sync::LazyLock::new(Telemetry::default);

/// Audit operation recorded for one document transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOp {
    SoftDelete,
    Restore,
}

impl AuditOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SoftDelete => "soft_delete",
            Self::Restore => "restore",
        }
    }
}

pub fn set_audit_sink_for_tests(sink: Arc<RwLock<Vec<String>>>) {
    *TELEMETRY.audit_sink.write() = Some(sink);
}

pub fn clear_audit_sink_for_tests() {
    *TELEMETRY.audit_sink.write() = None;
}

fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub(crate) fn record_filter_injected() {
    TELEMETRY.metrics.filters_injected_total.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_filter_bypassed() {
    TELEMETRY.metrics.filters_bypassed_total.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_aggregation_rewritten() {
    TELEMETRY.metrics.aggregations_rewritten_total.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_transitions(op: AuditOp, n: u64) {
    let counter = match op {
        AuditOp::SoftDelete => &TELEMETRY.metrics.soft_deleted_total,
        AuditOp::Restore => &TELEMETRY.metrics.restored_total,
    };
    counter.fetch_add(n, Ordering::Relaxed);
}

/// Emit one structured audit line on the audit target (and the test sink if installed).
pub fn log_audit(op: AuditOp, collection: &str, doc_id: &str) {
    let line = serde_json::json!({
        "ts": now_ts(), "op": op.as_str(), "collection": collection, "doc_id": doc_id
    })
    .to_string();
    log::info!(target: AUDIT_TARGET, "{line}");
    let audit_clone = TELEMETRY.audit_sink.read().clone();
    if let Some(sink) = audit_clone {
        sink.write().push(line);
    }
}

#[must_use]
pub fn metrics_text() -> String {
    // OpenMetrics/Prometheus exposition format (no types/HELP for brevity)
    let m = &TELEMETRY.metrics;
    format!(
        "softdelete_filters_injected_total {}\n\
         softdelete_filters_bypassed_total {}\n\
         softdelete_soft_deleted_total {}\n\
         softdelete_restored_total {}\n\
         softdelete_aggregations_rewritten_total {}\n",
        m.filters_injected_total.load(Ordering::Relaxed),
        m.filters_bypassed_total.load(Ordering::Relaxed),
        m.soft_deleted_total.load(Ordering::Relaxed),
        m.restored_total.load(Ordering::Relaxed),
        m.aggregations_rewritten_total.load(Ordering::Relaxed),
    )
}
