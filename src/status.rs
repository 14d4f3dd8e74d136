//! Status projection
//!
//! Maps the result of an audit pass onto the consistency state a
//! reconciliation loop publishes.

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::Error;
use crate::audit::AuditOutcome;
use crate::violation::{RepairAction, Severity, Violation, ViolationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsistencyState {
    /// No violations
    Consistent,
    /// Violations found, no repair computed
    Inconsistent,
    /// Violations found, at least one repair computed
    RepairPending,
    /// Applying repairs failed. Never produced by the audit itself.
    RepairFailed,
    /// Audit in progress, or interrupted by a fatal error
    Checking,
}

impl ConsistencyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyState::Consistent => "Consistent",
            ConsistencyState::Inconsistent => "Inconsistent",
            ConsistencyState::RepairPending => "RepairPending",
            ConsistencyState::RepairFailed => "RepairFailed",
            ConsistencyState::Checking => "Checking",
        }
    }

    pub fn project(violations: &[Violation], repairs: &[RepairAction]) -> Self {
        if violations.is_empty() {
            ConsistencyState::Consistent
        } else if repairs.is_empty() {
            ConsistencyState::Inconsistent
        } else {
            ConsistencyState::RepairPending
        }
    }
}

impl fmt::Display for ConsistencyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable status of one audit pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStatus {
    pub consistency_state: ConsistencyState,
    pub violations: Vec<Violation>,
    pub repair_actions: Vec<RepairAction>,
    /// Whether a fresh pass may succeed without changes to the topology
    pub retryable: bool,
}

impl AuditStatus {
    /// Status of a pass that ran to completion.
    pub fn from_outcome(outcome: &AuditOutcome) -> Self {
        Self {
            consistency_state: ConsistencyState::project(
                &outcome.report.violations,
                &outcome.repairs,
            ),
            violations: outcome.report.violations.clone(),
            repair_actions: outcome.repairs.clone(),
            retryable: false,
        }
    }

    /// Status of a pass aborted by a fatal error.
    ///
    /// The state stays `Checking` and the failure is surfaced as a single
    /// `ReconciliationError` violation against `subject`.
    pub fn from_error(subject: &str, err: &Error) -> Self {
        Self {
            consistency_state: ConsistencyState::Checking,
            violations: vec![Violation::new(
                ViolationKind::ReconciliationError,
                subject,
                err.to_string(),
                Severity::Error,
            )],
            repair_actions: Vec::new(),
            retryable: err.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::RepairKind;
    use rusqlite::ffi;

    fn violation() -> Violation {
        Violation::new(
            ViolationKind::ForeignKeyViolation,
            "DestinationRule/default/ghost-dr",
            "References non-existent Service/default/ghost",
            Severity::Error,
        )
    }

    #[test]
    fn test_project_states() {
        assert_eq!(ConsistencyState::project(&[], &[]), ConsistencyState::Consistent);
        assert_eq!(
            ConsistencyState::project(&[violation()], &[]),
            ConsistencyState::Inconsistent
        );

        let repair = RepairAction {
            kind: RepairKind::Update,
            resource: "Service/* (host: a)".into(),
            action: "Resolve shared host".into(),
            reason: "Multiple services share the same host".into(),
        };
        assert_eq!(
            ConsistencyState::project(&[violation()], &[repair]),
            ConsistencyState::RepairPending
        );
    }

    #[test]
    fn test_from_error_wraps_failure() {
        let err = Error::Storage(rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_BUSY),
            Some("database is locked".into()),
        ));
        let status = AuditStatus::from_error("checkout-mesh", &err);

        assert_eq!(status.consistency_state, ConsistencyState::Checking);
        assert_eq!(status.violations.len(), 1);
        assert_eq!(status.violations[0].kind, ViolationKind::ReconciliationError);
        assert_eq!(status.violations[0].resource, "checkout-mesh");
        assert!(status.violations[0].message.contains("database is locked"));
        assert!(status.repair_actions.is_empty());
        assert!(status.retryable);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = AuditStatus {
            consistency_state: ConsistencyState::Consistent,
            violations: vec![],
            repair_actions: vec![],
            retryable: false,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["consistencyState"], "Consistent");
        assert!(json["repairActions"].as_array().unwrap().is_empty());
    }
}
