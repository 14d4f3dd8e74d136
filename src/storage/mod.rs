//! Storage Layer - private SQLite store for one audit pass
//!
//! Tables:
//! - services(namespace, name, host, port, protocol)
//! - gateways(namespace, name)
//! - virtual_services(namespace, name, gateway_*, host, service_*)
//! - destination_rules(namespace, name, service_*, subsets, traffic_policy, host)

pub mod schema;
pub mod sqlite;

pub use sqlite::{IntegrityStore, StoreStats};
