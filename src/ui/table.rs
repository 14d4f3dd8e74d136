use tabled::{settings::Style, Table, Tabled};
use crate::storage::StoreStats;
use crate::violation::{RepairAction, Violation};

#[derive(Tabled)]
struct ViolationRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Tabled)]
struct RepairRow {
    #[tabled(rename = "Action")]
    kind: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Description")]
    action: String,
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Table")]
    table: &'static str,
    #[tabled(rename = "Rows")]
    rows: usize,
}

fn rounded<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn violation_table(violations: &[Violation]) -> String {
    let rows: Vec<ViolationRow> = violations
        .iter()
        .map(|v| ViolationRow {
            severity: v.severity.to_string(),
            kind: v.kind.to_string(),
            resource: v.resource.clone(),
            message: v.message.clone(),
        })
        .collect();
    rounded(&rows)
}

pub fn repair_table(repairs: &[RepairAction]) -> String {
    let rows: Vec<RepairRow> = repairs
        .iter()
        .map(|r| RepairRow {
            kind: r.kind.to_string(),
            resource: r.resource.clone(),
            action: r.action.clone(),
        })
        .collect();
    rounded(&rows)
}

pub fn stats_table(stats: &StoreStats) -> String {
    let rows = [
        StatRow { table: "gateways", rows: stats.gateways },
        StatRow { table: "services", rows: stats.services },
        StatRow { table: "virtual_services", rows: stats.virtual_services },
        StatRow { table: "destination_rules", rows: stats.destination_rules },
    ];
    rounded(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::{Severity, ViolationKind};

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(violation_table(&[]).is_empty());
        assert!(repair_table(&[]).is_empty());
    }

    #[test]
    fn test_violation_table_contains_fields() {
        let table = violation_table(&[Violation::new(
            ViolationKind::ForeignKeyViolation,
            "VirtualService/default/web-vs",
            "References non-existent Gateway/istio-system/gone",
            Severity::Error,
        )]);
        assert!(table.contains("Severity"));
        assert!(table.contains("ForeignKeyViolation"));
        assert!(table.contains("VirtualService/default/web-vs"));
    }

    #[test]
    fn test_stats_table() {
        let table = stats_table(&StoreStats { gateways: 1, services: 3, ..Default::default() });
        assert!(table.contains("virtual_services"));
        assert!(table.contains("3"));
    }
}
