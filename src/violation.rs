//! Violation and repair types - the output contract of an audit pass
//!
//! A [`Violation`] reports one broken invariant; a [`RepairAction`] is the
//! deterministic corrective operation suggested for it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of broken invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// A cross-reference does not resolve to an existing record
    ForeignKeyViolation,
    /// Several records claim a key that must be unique
    UniqueConstraintViolation,
    /// The audit pass itself failed; produced by status projection, never by the verifier
    ReconciliationError,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::ForeignKeyViolation => "ForeignKeyViolation",
            ViolationKind::UniqueConstraintViolation => "UniqueConstraintViolation",
            ViolationKind::ReconciliationError => "ReconciliationError",
        }
    }
}

impl FromStr for ViolationKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ForeignKeyViolation" => Ok(ViolationKind::ForeignKeyViolation),
            "UniqueConstraintViolation" => Ok(ViolationKind::UniqueConstraintViolation),
            "ReconciliationError" => Ok(ViolationKind::ReconciliationError),
            _ => Err(crate::Error::InvalidKind(format!("Unknown violation type: {}", s))),
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized report of one broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    /// Offending resource, e.g. `VirtualService/default/web-vs` or
    /// `Service/* (host: web.default.svc.cluster.local, port: 80)` for groups
    pub resource: String,
    pub message: String,
    pub severity: Severity,
}

impl Violation {
    pub fn new(
        kind: ViolationKind,
        resource: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            kind,
            resource: resource.into(),
            message: message.into(),
            severity,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}: {}", self.severity, self.kind, self.resource, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepairKind {
    Delete,
    Update,
}

impl RepairKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairKind::Delete => "Delete",
            RepairKind::Update => "Update",
        }
    }
}

impl fmt::Display for RepairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A suggested corrective operation derived from one violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairAction {
    #[serde(rename = "type")]
    pub kind: RepairKind,
    /// Target resource, identical to the violation's resource
    pub resource: String,
    /// Human-readable description of the action
    pub action: String,
    /// The violation message that motivated the action
    pub reason: String,
}

/// Outcome of the verifier: every violation found in one populated store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub is_consistent: bool,
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            is_consistent: violations.is_empty(),
            violations,
        }
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.violations.iter().filter(|v| v.severity == severity).count()
    }

    pub fn count_by_kind(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    /// True when at least one violation is at Error severity
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(Violation::is_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_serializes_with_type_tag() {
        let v = Violation::new(
            ViolationKind::ForeignKeyViolation,
            "VirtualService/default/broken-vs",
            "References non-existent Gateway/istio-system/missing",
            Severity::Error,
        );
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["type"], "ForeignKeyViolation");
        assert_eq!(json["severity"], "Error");
        assert_eq!(json["resource"], "VirtualService/default/broken-vs");
    }

    #[test]
    fn test_violation_kind_parse() {
        let kind: ViolationKind = "UniqueConstraintViolation".parse().unwrap();
        assert_eq!(kind, ViolationKind::UniqueConstraintViolation);
        assert!("NotAViolation".parse::<ViolationKind>().is_err());
    }

    #[test]
    fn test_report_consistency_follows_violations() {
        assert!(IntegrityReport::from_violations(vec![]).is_consistent);

        let report = IntegrityReport::from_violations(vec![Violation::new(
            ViolationKind::UniqueConstraintViolation,
            "Service/* (host: a.default.svc.cluster.local)",
            "Multiple services share the same host",
            Severity::Warning,
        )]);
        assert!(!report.is_consistent);
        assert!(!report.has_errors());
        assert_eq!(report.count_by_severity(Severity::Warning), 1);
    }
}
