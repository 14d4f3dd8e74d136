//! Database schema definitions
//!
//! Host uniqueness and (host, gateway) uniqueness are deliberately not declared
//! as UNIQUE constraints: duplicates must load so the verifier can report them.
//! The matching indexes below are plain lookup indexes.

/// SQL to create the services table (one row per service port)
pub const CREATE_SERVICES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS services (
    namespace TEXT NOT NULL,
    name TEXT NOT NULL,
    host TEXT NOT NULL,
    port INTEGER NOT NULL,
    protocol TEXT NOT NULL,
    PRIMARY KEY (namespace, name)
)
"#;

/// SQL to create the gateways table
pub const CREATE_GATEWAYS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS gateways (
    namespace TEXT NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (namespace, name)
)
"#;

/// SQL to create the virtual_services table
pub const CREATE_VIRTUAL_SERVICES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS virtual_services (
    namespace TEXT NOT NULL,
    name TEXT NOT NULL,
    gateway_namespace TEXT NOT NULL,
    gateway_name TEXT NOT NULL,
    host TEXT NOT NULL,
    service_namespace TEXT NOT NULL,
    service_name TEXT NOT NULL,
    PRIMARY KEY (namespace, name),
    FOREIGN KEY (gateway_namespace, gateway_name)
        REFERENCES gateways(namespace, name),
    FOREIGN KEY (service_namespace, service_name)
        REFERENCES services(namespace, name)
)
"#;

/// SQL to create the destination_rules table
/// A destination rule references the Kubernetes service it applies to
pub const CREATE_DESTINATION_RULES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS destination_rules (
    namespace TEXT NOT NULL,
    name TEXT NOT NULL,
    service_namespace TEXT NOT NULL,
    service_name TEXT NOT NULL,
    subsets TEXT,
    traffic_policy TEXT,
    host TEXT NOT NULL,
    PRIMARY KEY (namespace, name),
    FOREIGN KEY (service_namespace, service_name)
        REFERENCES services(namespace, name)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_services_host_port ON services(host, port)",
    "CREATE INDEX IF NOT EXISTS idx_vs_host_gateway ON virtual_services(host, gateway_namespace, gateway_name)",
    "CREATE INDEX IF NOT EXISTS idx_vs_service_ref ON virtual_services(service_namespace, service_name)",
    "CREATE INDEX IF NOT EXISTS idx_dr_service_ref ON destination_rules(service_namespace, service_name)",
];

/// Table names in load order
pub const TABLES: &[&str] = &["gateways", "services", "virtual_services", "destination_rules"];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_SERVICES_TABLE,
        CREATE_GATEWAYS_TABLE,
        CREATE_VIRTUAL_SERVICES_TABLE,
        CREATE_DESTINATION_RULES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// The full DDL as one script, statements terminated with `;`
pub fn ddl() -> String {
    all_schema_statements()
        .iter()
        .map(|stmt| format!("{};", stmt.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
