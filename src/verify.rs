//! Integrity verifier
//!
//! Runs a fixed, ordered set of read-only queries against a populated store:
//!
//! 1. VirtualService → Gateway references
//! 2. VirtualService → Service references
//! 3. DestinationRule → Service references
//! 4. duplicate (host, port) among services
//! 5. duplicate host among services (warning, independent of 4)
//! 6. duplicate (host, gateway) among virtual services
//!
//! Duplicate checks report one violation per colliding group, not per row.
//! A failing query aborts the whole check.

use rusqlite::Connection;
use crate::record::ResourceKind;
use crate::storage::IntegrityStore;
use crate::violation::{IntegrityReport, Severity, Violation, ViolationKind};
use crate::{Error, Result};

/// Check referential and uniqueness integrity of a loaded store.
pub fn check_integrity(store: &IntegrityStore) -> Result<IntegrityReport> {
    let conn = store.connection();
    let mut violations = Vec::new();

    for reference in REFERENCE_CHECKS {
        violations.extend(dangling_references(conn, reference)?);
    }
    violations.extend(duplicate_host_ports(conn)?);
    violations.extend(duplicate_hosts(conn)?);
    violations.extend(duplicate_host_gateways(conn)?);

    let report = IntegrityReport::from_violations(violations);
    tracing::debug!(
        consistent = report.is_consistent,
        violations = report.violations.len(),
        "Integrity check finished"
    );
    Ok(report)
}

/// One cross-reference that must resolve
struct ReferenceCheck {
    name: &'static str,
    source: ResourceKind,
    target: ResourceKind,
    /// Selects (namespace, name, ref_namespace, ref_name) of unresolved rows
    sql: &'static str,
}

const REFERENCE_CHECKS: &[ReferenceCheck] = &[
    ReferenceCheck {
        name: "virtual-service-gateway",
        source: ResourceKind::VirtualService,
        target: ResourceKind::Gateway,
        sql: r#"
            SELECT vs.namespace, vs.name, vs.gateway_namespace, vs.gateway_name
            FROM virtual_services vs
            LEFT JOIN gateways gw
                ON vs.gateway_namespace = gw.namespace AND vs.gateway_name = gw.name
            WHERE gw.namespace IS NULL
            ORDER BY vs.namespace, vs.name
        "#,
    },
    ReferenceCheck {
        name: "virtual-service-service",
        source: ResourceKind::VirtualService,
        target: ResourceKind::Service,
        sql: r#"
            SELECT vs.namespace, vs.name, vs.service_namespace, vs.service_name
            FROM virtual_services vs
            LEFT JOIN services s
                ON vs.service_namespace = s.namespace AND vs.service_name = s.name
            WHERE s.namespace IS NULL
            ORDER BY vs.namespace, vs.name
        "#,
    },
    ReferenceCheck {
        name: "destination-rule-service",
        source: ResourceKind::DestinationRule,
        target: ResourceKind::Service,
        sql: r#"
            SELECT dr.namespace, dr.name, dr.service_namespace, dr.service_name
            FROM destination_rules dr
            LEFT JOIN services s
                ON dr.service_namespace = s.namespace AND dr.service_name = s.name
            WHERE s.namespace IS NULL
            ORDER BY dr.namespace, dr.name
        "#,
    },
];

fn dangling_references(conn: &Connection, check: &ReferenceCheck) -> Result<Vec<Violation>> {
    let verify_err = |source| Error::Verify { check: check.name, source };

    let mut stmt = conn.prepare(check.sql).map_err(verify_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(verify_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(verify_err)?;

    Ok(rows
        .into_iter()
        .map(|(ns, name, ref_ns, ref_name)| {
            Violation::new(
                ViolationKind::ForeignKeyViolation,
                check.source.resource_id(&ns, &name),
                format!(
                    "References non-existent {}",
                    check.target.resource_id(&ref_ns, &ref_name)
                ),
                Severity::Error,
            )
        })
        .collect())
}

fn duplicate_host_ports(conn: &Connection) -> Result<Vec<Violation>> {
    let verify_err = |source| Error::Verify { check: "service-host-port", source };

    let mut stmt = conn
        .prepare(
            r#"
            SELECT host, port, COUNT(*) AS count
            FROM services
            GROUP BY host, port
            HAVING COUNT(*) > 1
            ORDER BY host, port
            "#,
        )
        .map_err(verify_err)?;
    let groups = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
        })
        .map_err(verify_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(verify_err)?;

    Ok(groups
        .into_iter()
        .map(|(host, port, count)| {
            Violation::new(
                ViolationKind::UniqueConstraintViolation,
                format!("Service/* (host: {}, port: {})", host, port),
                format!(
                    "Duplicate host:port combination: {}:{} ({} services)",
                    host, port, count
                ),
                Severity::Error,
            )
        })
        .collect())
}

fn duplicate_hosts(conn: &Connection) -> Result<Vec<Violation>> {
    let verify_err = |source| Error::Verify { check: "service-host", source };

    let mut stmt = conn
        .prepare(
            r#"
            SELECT host, COUNT(*) AS count
            FROM services
            GROUP BY host
            HAVING COUNT(*) > 1
            ORDER BY host
            "#,
        )
        .map_err(verify_err)?;
    let groups = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(verify_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(verify_err)?;

    // Reported even when the same rows already collided on host:port
    Ok(groups
        .into_iter()
        .map(|(host, count)| {
            Violation::new(
                ViolationKind::UniqueConstraintViolation,
                format!("Service/* (host: {})", host),
                format!(
                    "Multiple services share the same host: {} ({} services)",
                    host, count
                ),
                Severity::Warning,
            )
        })
        .collect())
}

fn duplicate_host_gateways(conn: &Connection) -> Result<Vec<Violation>> {
    let verify_err = |source| Error::Verify { check: "virtual-service-host-gateway", source };

    let mut stmt = conn
        .prepare(
            r#"
            SELECT host, gateway_namespace, gateway_name, COUNT(*) AS count
            FROM virtual_services
            GROUP BY host, gateway_namespace, gateway_name
            HAVING COUNT(*) > 1
            ORDER BY host, gateway_namespace, gateway_name
            "#,
        )
        .map_err(verify_err)?;
    let groups = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .map_err(verify_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(verify_err)?;

    Ok(groups
        .into_iter()
        .map(|(host, gw_ns, gw_name, count)| {
            Violation::new(
                ViolationKind::UniqueConstraintViolation,
                format!("VirtualService/* (host: {}, gateway: {}/{})", host, gw_ns, gw_name),
                format!(
                    "Multiple VirtualServices define the same host {} for Gateway {}/{} ({} virtual services)",
                    host, gw_ns, gw_name, count
                ),
                Severity::Error,
            )
        })
        .collect())
}
