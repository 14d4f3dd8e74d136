//! Repair planner
//!
//! Pure mapping from violations to suggested repair actions. A repaired
//! violation always yields the same action, so re-running the planner on an
//! unchanged report is idempotent.

use crate::record::ResourceKind;
use crate::violation::{RepairAction, RepairKind, Violation, ViolationKind};

/// Compute one repair action per recognized violation.
///
/// Violations without a known repair are left out of the plan but stay in the
/// report; they are logged so the gap is visible.
pub fn plan_repairs(violations: &[Violation]) -> Vec<RepairAction> {
    violations.iter().filter_map(plan_repair).collect()
}

/// Plan the repair for a single violation, if one is known.
pub fn plan_repair(violation: &Violation) -> Option<RepairAction> {
    match violation.kind {
        ViolationKind::ForeignKeyViolation => {
            if is_concrete(&violation.resource, ResourceKind::VirtualService) {
                Some(RepairAction {
                    kind: RepairKind::Delete,
                    resource: violation.resource.clone(),
                    action: "Delete broken VirtualService reference".to_string(),
                    reason: violation.message.clone(),
                })
            } else {
                // TODO: decide between deleting the rule and recreating the target service
                tracing::warn!(
                    resource = %violation.resource,
                    "No repair defined for dangling reference: {}",
                    violation.message
                );
                None
            }
        }
        ViolationKind::UniqueConstraintViolation => Some(RepairAction {
            kind: RepairKind::Update,
            resource: violation.resource.clone(),
            action: update_description(&violation.resource).to_string(),
            reason: violation.message.clone(),
        }),
        other => {
            tracing::warn!(
                kind = %other,
                resource = %violation.resource,
                "Repair planner has no mapping for violation type"
            );
            None
        }
    }
}

/// True for `<Kind>/<namespace>/<name>` identifiers of the given kind.
fn is_concrete(resource: &str, kind: ResourceKind) -> bool {
    resource
        .strip_prefix(kind.as_str())
        .and_then(|rest| rest.strip_prefix('/'))
        .map(|rest| {
            let parts: Vec<&str> = rest.split('/').collect();
            parts.len() == 2
                && parts
                    .iter()
                    .all(|p| !p.is_empty() && *p != "*" && !p.contains(char::is_whitespace))
        })
        .unwrap_or(false)
}

fn update_description(resource: &str) -> &'static str {
    if resource.starts_with("VirtualService/") {
        "Resolve host/gateway conflict"
    } else if resource.contains(", port: ") {
        "Resolve host:port conflict"
    } else {
        "Resolve shared host"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::Severity;

    fn violation(kind: ViolationKind, resource: &str, message: &str) -> Violation {
        Violation::new(kind, resource, message, Severity::Error)
    }

    #[test]
    fn test_plan_repairs() {
        let violations = vec![
            violation(
                ViolationKind::ForeignKeyViolation,
                "VirtualService/default/broken-vs",
                "References non-existent Gateway/istio-system/missing-gateway",
            ),
            violation(
                ViolationKind::UniqueConstraintViolation,
                "Service/* (host: duplicate.svc.cluster.local, port: 8080)",
                "Duplicate host:port combination: duplicate.svc.cluster.local:8080 (2 services)",
            ),
        ];

        let repairs = plan_repairs(&violations);
        assert_eq!(repairs.len(), 2);

        assert_eq!(repairs[0].kind, RepairKind::Delete);
        assert_eq!(repairs[0].resource, "VirtualService/default/broken-vs");
        assert_eq!(repairs[0].reason, violations[0].message);

        assert_eq!(repairs[1].kind, RepairKind::Update);
        assert_eq!(
            repairs[1].resource,
            "Service/* (host: duplicate.svc.cluster.local, port: 8080)"
        );
        assert_eq!(repairs[1].action, "Resolve host:port conflict");
    }

    #[test]
    fn test_no_violations_no_repairs() {
        assert!(plan_repairs(&[]).is_empty());
    }

    #[test]
    fn test_dangling_destination_rule_has_no_repair() {
        let v = violation(
            ViolationKind::ForeignKeyViolation,
            "DestinationRule/default/ghost-dr",
            "References non-existent Service/default/ghost",
        );
        assert!(plan_repair(&v).is_none());
    }

    #[test]
    fn test_reconciliation_error_has_no_repair() {
        let v = violation(ViolationKind::ReconciliationError, "my-mesh", "store unavailable");
        assert!(plan_repair(&v).is_none());
    }

    #[test]
    fn test_update_descriptions_follow_resource_pattern() {
        let shared = violation(
            ViolationKind::UniqueConstraintViolation,
            "Service/* (host: a.default.svc.cluster.local)",
            "Multiple services share the same host",
        );
        assert_eq!(plan_repair(&shared).unwrap().action, "Resolve shared host");

        let routed = violation(
            ViolationKind::UniqueConstraintViolation,
            "VirtualService/* (host: app.example.com, gateway: istio-system/gw)",
            "Multiple VirtualServices define the same host",
        );
        assert_eq!(plan_repair(&routed).unwrap().action, "Resolve host/gateway conflict");
    }

    #[test]
    fn test_planning_is_deterministic() {
        let violations = vec![violation(
            ViolationKind::ForeignKeyViolation,
            "VirtualService/default/broken-vs",
            "References non-existent Service/default/gone",
        )];
        assert_eq!(plan_repairs(&violations), plan_repairs(&violations));
    }

    #[test]
    fn test_is_concrete() {
        assert!(is_concrete("VirtualService/default/web-vs", ResourceKind::VirtualService));
        assert!(!is_concrete("VirtualService/* (host: a, gateway: b/c)", ResourceKind::VirtualService));
        assert!(!is_concrete("VirtualServiceX/default/web", ResourceKind::VirtualService));
        assert!(!is_concrete("VirtualService/default", ResourceKind::VirtualService));
    }
}
