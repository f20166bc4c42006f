//! Report sink: where finalized abuse reports go.
//!
//! Durable storage and review tooling live outside this process. The
//! default sink writes each report to the log and keeps per-reason counts
//! for the stats endpoint.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use tandem_core::{ReportReason, ReportRecord};

pub trait ReportSink: Send + Sync {
    /// Hand off a report. Must not block.
    fn submit(&self, record: ReportRecord);
}

#[derive(Clone, Default)]
pub struct TracingReportSink {
    by_reason: Arc<DashMap<ReportReason, u64>>,
    total: Arc<AtomicU64>,
}

impl TracingReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Counts per reason, zero-filled, in a stable order.
    pub fn counts(&self) -> BTreeMap<&'static str, u64> {
        ReportReason::ALL
            .into_iter()
            .map(|r| (r.as_str(), self.by_reason.get(&r).map(|c| *c).unwrap_or(0)))
            .collect()
    }
}

impl ReportSink for TracingReportSink {
    fn submit(&self, record: ReportRecord) {
        *self.by_reason.entry(record.reason).or_insert(0) += 1;
        self.total.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            report_id = %record.id,
            source = ?record.source,
            reported = %record.reported,
            reporter = ?record.reporter,
            session = ?record.session,
            reason = %record.reason,
            description = %record.description,
            "abuse report received"
        );
    }
}
