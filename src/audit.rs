//! Audit pipeline
//!
//! One pass: open a private store, load the snapshot, verify, plan repairs.
//! The store is dropped when the pass returns.

use serde::Serialize;
use crate::Result;
use crate::record::RelationalModel;
use crate::repair::plan_repairs;
use crate::storage::{IntegrityStore, StoreStats};
use crate::verify::check_integrity;
use crate::violation::{IntegrityReport, RepairAction};

/// Everything one audit pass produces.
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    pub report: IntegrityReport,
    pub repairs: Vec<RepairAction>,
    pub stats: StoreStats,
}

impl AuditOutcome {
    pub fn is_consistent(&self) -> bool {
        self.report.is_consistent
    }
}

/// Run a full audit pass over `model`.
///
/// Fatal errors (schema, load, query) are returned; domain violations are
/// part of the outcome.
pub fn run_audit(model: &RelationalModel) -> Result<AuditOutcome> {
    let mut store = IntegrityStore::open_in_memory()?;
    let stats = store.load(model)?;

    let report = check_integrity(&store)?;
    let repairs = if report.is_consistent {
        Vec::new()
    } else {
        plan_repairs(&report.violations)
    };

    tracing::info!(
        consistent = report.is_consistent,
        violations = report.violations.len(),
        repairs = repairs.len(),
        "Audit completed"
    );

    Ok(AuditOutcome { report, repairs, stats })
}
