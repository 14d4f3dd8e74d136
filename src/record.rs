//! Record Model - connection-free shapes of the audited resources
//!
//! Four resource kinds take part in an audit:
//! - `Service`: a backend endpoint (one record per exposed port)
//! - `Gateway`: a network entry point
//! - `VirtualService`: binds an exposed host on a gateway to a backend service
//! - `DestinationRule`: a traffic policy bound to a backend service
//!
//! A [`RelationalModel`] aggregates one snapshot of all four for a single pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default cluster DNS suffix used when deriving service hosts.
pub const DEFAULT_CLUSTER_DOMAIN: &str = "svc.cluster.local";

/// Derive the fully-qualified host of a service: `<name>.<namespace>.<suffix>`.
///
/// This is the only place the host pattern is spelled out; snapshot readers
/// and anything comparing hosts go through it.
pub fn service_host(name: &str, namespace: &str, cluster_domain: &str) -> String {
    let suffix = cluster_domain.trim_matches('.');
    format!("{}.{}.{}", name, namespace, suffix)
}

/// Resource kinds that appear in violation and repair identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Service,
    Gateway,
    VirtualService,
    DestinationRule,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Service => "Service",
            ResourceKind::Gateway => "Gateway",
            ResourceKind::VirtualService => "VirtualService",
            ResourceKind::DestinationRule => "DestinationRule",
        }
    }

    /// Format a concrete resource identifier, e.g. `Gateway/istio-system/main`.
    pub fn resource_id(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}/{}", self.as_str(), namespace, name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A (namespace, name) pair pointing at another record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectRef {
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One exposed port of a backend service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub namespace: String,
    pub name: String,
    /// Fully-qualified host, see [`service_host`]
    pub host: String,
    pub port: i32,
    /// Transport protocol (TCP, UDP, ...)
    pub protocol: String,
}

impl ServiceRecord {
    /// Build a record with its host derived from name, namespace and cluster domain.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        port: i32,
        protocol: impl Into<String>,
        cluster_domain: &str,
    ) -> Self {
        let namespace = namespace.into();
        let name = name.into();
        let host = service_host(&name, &namespace, cluster_domain);
        Self {
            namespace,
            name,
            host,
            port,
            protocol: protocol.into(),
        }
    }

    pub fn resource_id(&self) -> String {
        ResourceKind::Service.resource_id(&self.namespace, &self.name)
    }
}

/// A gateway entry point. Identity only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRecord {
    pub namespace: String,
    pub name: String,
}

impl GatewayRecord {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn resource_id(&self) -> String {
        ResourceKind::Gateway.resource_id(&self.namespace, &self.name)
    }
}

/// A routing rule exposing `host` on `gateway` and forwarding to `service`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualServiceRecord {
    pub namespace: String,
    pub name: String,
    pub gateway: ObjectRef,
    /// Externally exposed host
    pub host: String,
    pub service: ObjectRef,
}

impl VirtualServiceRecord {
    pub fn resource_id(&self) -> String {
        ResourceKind::VirtualService.resource_id(&self.namespace, &self.name)
    }
}

/// A traffic policy applied to a backend service.
///
/// A destination rule targets a Kubernetes service, not a virtual service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRuleRecord {
    pub namespace: String,
    pub name: String,
    pub service: ObjectRef,
    /// Fully-qualified host of the targeted service
    pub host: String,
    /// Subset names joined with `,`
    pub subsets: Option<String>,
    /// Serialized traffic policy (JSON)
    pub traffic_policy: Option<String>,
}

impl DestinationRuleRecord {
    pub fn resource_id(&self) -> String {
        ResourceKind::DestinationRule.resource_id(&self.namespace, &self.name)
    }
}

/// One in-memory snapshot of the topology, the input to one audit pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalModel {
    pub services: Vec<ServiceRecord>,
    pub gateways: Vec<GatewayRecord>,
    pub virtual_services: Vec<VirtualServiceRecord>,
    pub destination_rules: Vec<DestinationRuleRecord>,
}

impl RelationalModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all kinds
    pub fn len(&self) -> usize {
        self.services.len()
            + self.gateways.len()
            + self.virtual_services.len()
            + self.destination_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
