//! SQLite store and loader

use rusqlite::{Connection, Transaction, params};
use crate::classify::classify;
use crate::record::RelationalModel;
use crate::{Error, Result};
use super::schema;

/// In-memory SQLite store holding one topology snapshot.
///
/// Every audit pass opens its own store; a store is never shared between
/// passes and is dropped once the pass is over.
pub struct IntegrityStore {
    conn: Connection,
}

impl IntegrityStore {
    /// Open a private in-memory store with the schema applied and
    /// foreign-key enforcement on.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.set_foreign_keys(true)?;
        store.initialize_schema()?;
        Ok(store)
    }

    /// Apply the schema. Safe to call again on the same store.
    pub fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, []).map_err(Error::Schema)?;
        }
        Ok(())
    }

    /// Toggle foreign-key enforcement. Has no effect inside an open transaction.
    pub fn set_foreign_keys(&self, enabled: bool) -> Result<()> {
        let pragma = if enabled {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        self.conn.execute_batch(pragma)?;
        Ok(())
    }

    pub fn foreign_keys_enabled(&self) -> Result<bool> {
        let enabled: i64 = self.conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        Ok(enabled == 1)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========== Loader ==========

    /// Load a snapshot in one transaction with foreign-key enforcement off.
    ///
    /// Dangling references are stored as-is for the verifier to find. Any
    /// row that fails to insert (missing required field, duplicate identity)
    /// rolls back the whole load and is returned as [`Error::Load`].
    /// Enforcement is switched back on afterwards in both cases; committed
    /// rows are not re-validated.
    pub fn load(&mut self, model: &RelationalModel) -> Result<StoreStats> {
        self.set_foreign_keys(false)?;

        let loaded = self.load_in_transaction(model);
        let restored = self.set_foreign_keys(true);

        let stats = loaded?;
        restored?;

        tracing::debug!(
            gateways = stats.gateways,
            services = stats.services,
            virtual_services = stats.virtual_services,
            destination_rules = stats.destination_rules,
            "Loaded relational model"
        );
        Ok(stats)
    }

    fn load_in_transaction(&mut self, model: &RelationalModel) -> Result<StoreStats> {
        let tx = self.conn.transaction()?;

        insert_gateways(&tx, model)?;
        insert_services(&tx, model)?;
        insert_virtual_services(&tx, model)?;
        insert_destination_rules(&tx, model)?;

        tx.commit()?;

        Ok(StoreStats {
            gateways: model.gateways.len(),
            services: model.services.len(),
            virtual_services: model.virtual_services.len(),
            destination_rules: model.destination_rules.len(),
        })
    }

    // ========== Statistics ==========

    pub fn count_rows(&self, table: &str) -> Result<usize> {
        if !schema::TABLES.contains(&table) {
            return Err(Error::InvalidKind(format!("Unknown table: {}", table)));
        }
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get row counts for every table
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            gateways: self.count_rows("gateways")?,
            services: self.count_rows("services")?,
            virtual_services: self.count_rows("virtual_services")?,
            destination_rules: self.count_rows("destination_rules")?,
        })
    }
}

/// Empty identity and host fields are bound as NULL so the NOT NULL columns
/// reject them. Cross-references are bound as given: an empty reference is a
/// dangling one and is left for the verifier.
fn required(value: &str) -> Option<&str> {
    if value.trim().is_empty() { None } else { Some(value) }
}

fn load_error(table: &'static str, resource: String, source: rusqlite::Error) -> Error {
    let category = classify(&source);
    tracing::warn!(table, %resource, %category, "Row rejected, rolling back load: {}", source);
    Error::Load { table, resource, category, source }
}

fn insert_gateways(tx: &Transaction<'_>, model: &RelationalModel) -> Result<()> {
    let mut stmt = tx.prepare("INSERT INTO gateways (namespace, name) VALUES (?1, ?2)")?;
    for gw in &model.gateways {
        stmt.execute(params![required(&gw.namespace), required(&gw.name)])
            .map_err(|e| load_error("gateways", gw.resource_id(), e))?;
    }
    Ok(())
}

fn insert_services(tx: &Transaction<'_>, model: &RelationalModel) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO services (namespace, name, host, port, protocol) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for svc in &model.services {
        stmt.execute(params![
            required(&svc.namespace),
            required(&svc.name),
            required(&svc.host),
            svc.port,
            required(&svc.protocol),
        ])
        .map_err(|e| load_error("services", svc.resource_id(), e))?;
    }
    Ok(())
}

fn insert_virtual_services(tx: &Transaction<'_>, model: &RelationalModel) -> Result<()> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO virtual_services
            (namespace, name, gateway_namespace, gateway_name, host, service_namespace, service_name)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )?;
    for vs in &model.virtual_services {
        stmt.execute(params![
            required(&vs.namespace),
            required(&vs.name),
            &vs.gateway.namespace,
            &vs.gateway.name,
            required(&vs.host),
            &vs.service.namespace,
            &vs.service.name,
        ])
        .map_err(|e| load_error("virtual_services", vs.resource_id(), e))?;
    }
    Ok(())
}

fn insert_destination_rules(tx: &Transaction<'_>, model: &RelationalModel) -> Result<()> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO destination_rules
            (namespace, name, service_namespace, service_name, subsets, traffic_policy, host)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )?;
    for dr in &model.destination_rules {
        stmt.execute(params![
            required(&dr.namespace),
            required(&dr.name),
            &dr.service.namespace,
            &dr.service.name,
            dr.subsets,
            dr.traffic_policy,
            required(&dr.host),
        ])
        .map_err(|e| load_error("destination_rules", dr.resource_id(), e))?;
    }
    Ok(())
}

/// Row counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub gateways: usize,
    pub services: usize,
    pub virtual_services: usize,
    pub destination_rules: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Gateways: {}", self.gateways)?;
        writeln!(f, "  Services: {}", self.services)?;
        writeln!(f, "  VirtualServices: {}", self.virtual_services)?;
        writeln!(f, "  DestinationRules: {}", self.destination_rules)
    }
}
