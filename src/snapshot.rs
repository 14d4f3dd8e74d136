//! Snapshot files - JSON input for an audit pass
//!
//! ```json
//! {
//!   "services": [{ "namespace": "default", "name": "web", "port": 80 }],
//!   "gateways": [{ "namespace": "istio-system", "name": "main-gateway" }],
//!   "virtualServices": [{
//!     "namespace": "default", "name": "web-vs", "host": "web.example.com",
//!     "gateway": { "namespace": "istio-system", "name": "main-gateway" },
//!     "service": { "namespace": "default", "name": "web" }
//!   }],
//!   "destinationRules": [{
//!     "namespace": "default", "name": "web-dr",
//!     "service": { "namespace": "default", "name": "web" },
//!     "subsets": ["v1", "v2"],
//!     "trafficPolicy": { "loadBalancer": { "simple": "LEAST_CONN" } }
//!   }]
//! }
//! ```
//!
//! Missing service and destination-rule hosts are derived with
//! [`service_host`]. Missing identity fields are kept empty so the loader
//! rejects the row.

use std::path::Path;
use serde::Deserialize;
use crate::record::*;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile {
    #[serde(default)]
    services: Vec<ServiceEntry>,
    #[serde(default)]
    gateways: Vec<GatewayEntry>,
    #[serde(default)]
    virtual_services: Vec<VirtualServiceEntry>,
    #[serde(default)]
    destination_rules: Vec<DestinationRuleEntry>,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    name: String,
    host: Option<String>,
    port: i32,
    #[serde(default = "default_protocol")]
    protocol: String,
}

fn default_protocol() -> String {
    "TCP".to_string()
}

#[derive(Debug, Deserialize)]
struct GatewayEntry {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct VirtualServiceEntry {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    gateway: ObjectRef,
    #[serde(default)]
    host: String,
    #[serde(default)]
    service: ObjectRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DestinationRuleEntry {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    service: ObjectRef,
    host: Option<String>,
    subsets: Option<Subsets>,
    traffic_policy: Option<serde_json::Value>,
}

/// Subsets given either as a list of names or already comma-joined
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Subsets {
    List(Vec<String>),
    Joined(String),
}

impl Subsets {
    fn joined(self) -> String {
        match self {
            Subsets::List(names) => names.join(","),
            Subsets::Joined(joined) => joined,
        }
    }
}

/// Parse a JSON snapshot into a relational model.
pub fn parse_snapshot(json: &str, cluster_domain: &str) -> Result<RelationalModel> {
    let file: SnapshotFile = serde_json::from_str(json)?;
    file.into_model(cluster_domain)
}

/// Read and parse a JSON snapshot file.
pub fn read_snapshot(path: &Path, cluster_domain: &str) -> Result<RelationalModel> {
    let contents = std::fs::read_to_string(path)?;
    parse_snapshot(&contents, cluster_domain)
        .map_err(|e| match e {
            Error::Json(source) => Error::Snapshot { path: path.display().to_string(), source },
            other => other,
        })
}

impl SnapshotFile {
    fn into_model(self, cluster_domain: &str) -> Result<RelationalModel> {
        let services = self
            .services
            .into_iter()
            .map(|s| {
                let host = s
                    .host
                    .unwrap_or_else(|| service_host(&s.name, &s.namespace, cluster_domain));
                ServiceRecord {
                    namespace: s.namespace,
                    name: s.name,
                    host,
                    port: s.port,
                    protocol: s.protocol,
                }
            })
            .collect();

        let gateways = self
            .gateways
            .into_iter()
            .map(|g| GatewayRecord::new(g.namespace, g.name))
            .collect();

        let virtual_services = self
            .virtual_services
            .into_iter()
            .map(|vs| VirtualServiceRecord {
                namespace: vs.namespace,
                name: vs.name,
                gateway: vs.gateway,
                host: vs.host,
                service: vs.service,
            })
            .collect();

        let destination_rules = self
            .destination_rules
            .into_iter()
            .map(|dr| {
                let host = dr.host.unwrap_or_else(|| {
                    service_host(&dr.service.name, &dr.service.namespace, cluster_domain)
                });
                let traffic_policy = match dr.traffic_policy {
                    None | Some(serde_json::Value::Null) => None,
                    Some(serde_json::Value::String(raw)) => Some(raw),
                    Some(value) => Some(serde_json::to_string(&value)?),
                };
                Ok(DestinationRuleRecord {
                    namespace: dr.namespace,
                    name: dr.name,
                    service: dr.service,
                    host,
                    subsets: dr.subsets.map(Subsets::joined),
                    traffic_policy,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RelationalModel {
            services,
            gateways,
            virtual_services,
            destination_rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SNAPSHOT: &str = r#"
    {
      "services": [
        { "namespace": "default", "name": "web", "port": 80 },
        { "namespace": "default", "name": "legacy", "host": "legacy.example.internal", "port": 8080, "protocol": "UDP" }
      ],
      "gateways": [{ "namespace": "istio-system", "name": "main-gateway" }],
      "virtualServices": [{
        "namespace": "default", "name": "web-vs", "host": "web.example.com",
        "gateway": { "namespace": "istio-system", "name": "main-gateway" },
        "service": { "namespace": "default", "name": "web" }
      }],
      "destinationRules": [{
        "namespace": "default", "name": "web-dr",
        "service": { "namespace": "default", "name": "web" },
        "subsets": ["v1", "v2"],
        "trafficPolicy": { "loadBalancer": { "simple": "LEAST_CONN" } }
      }]
    }
    "#;

    #[test]
    fn test_parse_snapshot() {
        let model = parse_snapshot(SNAPSHOT, DEFAULT_CLUSTER_DOMAIN).unwrap();
        assert_eq!(model.services.len(), 2);
        assert_eq!(model.services[0].host, "web.default.svc.cluster.local");
        assert_eq!(model.services[0].protocol, "TCP");
        assert_eq!(model.services[1].host, "legacy.example.internal");
        assert_eq!(model.services[1].protocol, "UDP");

        assert_eq!(model.virtual_services[0].gateway, ObjectRef::new("istio-system", "main-gateway"));

        let dr = &model.destination_rules[0];
        assert_eq!(dr.host, "web.default.svc.cluster.local");
        assert_eq!(dr.subsets.as_deref(), Some("v1,v2"));
        assert_eq!(
            dr.traffic_policy.as_deref(),
            Some(r#"{"loadBalancer":{"simple":"LEAST_CONN"}}"#)
        );
    }

    #[test]
    fn test_custom_cluster_domain() {
        let json = r#"{ "services": [{ "namespace": "prod", "name": "reviews", "port": 9080 }] }"#;
        let model = parse_snapshot(json, "svc.corp.local").unwrap();
        assert_eq!(model.services[0].host, "reviews.prod.svc.corp.local");
    }

    #[test]
    fn test_missing_identity_is_kept_empty() {
        let json = r#"{ "gateways": [{ "name": "orphan" }] }"#;
        let model = parse_snapshot(json, DEFAULT_CLUSTER_DOMAIN).unwrap();
        assert_eq!(model.gateways[0].namespace, "");
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_snapshot("{ not json", DEFAULT_CLUSTER_DOMAIN),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_read_snapshot_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();

        let model = read_snapshot(file.path(), DEFAULT_CLUSTER_DOMAIN).unwrap();
        assert_eq!(model.len(), 5);

        let missing = read_snapshot(Path::new("/nonexistent/snapshot.json"), DEFAULT_CLUSTER_DOMAIN);
        assert!(matches!(missing, Err(Error::Io(_))));
    }

    #[test]
    fn test_malformed_file_keeps_json_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "services": [{ "name": "web", "port": "eighty" }] }"#).unwrap();

        let err = read_snapshot(file.path(), DEFAULT_CLUSTER_DOMAIN).unwrap_err();
        match &err {
            Error::Snapshot { path, source } => {
                assert_eq!(path, &file.path().display().to_string());
                assert!(source.is_data());
            }
            other => panic!("unexpected error: {other}"),
        }
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<serde_json::Error>().is_some());
    }
}
