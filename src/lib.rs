//! # meshaudit - Service-mesh topology integrity audit
//!
//! Audits a snapshot of mutually-referencing mesh resources (services,
//! gateways, virtual services, destination rules) and reports:
//! - dangling cross-references (a route pointing at a missing gateway or service)
//! - illegitimate duplicates (shared host:port, shared host, shared host+gateway)
//!
//! Each finding is turned into a deterministic repair suggestion.
//!
//! One audit pass runs Loader → Verifier → Repair Planner over a private
//! in-memory SQLite store that is discarded afterwards.

pub mod record;
pub mod violation;
pub mod classify;
pub mod storage;
pub mod verify;
pub mod repair;
pub mod status;
pub mod snapshot;
pub mod audit;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use record::{
    DestinationRuleRecord, GatewayRecord, ObjectRef, RelationalModel, ServiceRecord,
    VirtualServiceRecord, service_host,
};
pub use violation::{IntegrityReport, RepairAction, RepairKind, Severity, Violation, ViolationKind};
pub use classify::{ErrorCategory, classify};
pub use storage::IntegrityStore;
pub use verify::check_integrity;
pub use repair::plan_repairs;
pub use status::{AuditStatus, ConsistencyState};
pub use audit::{AuditOutcome, run_audit};

/// Result type alias for meshaudit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for meshaudit operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("Failed to load {table} row {resource} ({category}): {source}")]
    Load {
        table: &'static str,
        resource: String,
        category: ErrorCategory,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Integrity check '{check}' failed: {source}")]
    Verify {
        check: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid kind: {0}")]
    InvalidKind(String),

    #[error("Invalid snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The underlying storage error, if this error came from the store
    pub fn storage_error(&self) -> Option<&rusqlite::Error> {
        match self {
            Error::Storage(e) | Error::Schema(e) => Some(e),
            Error::Load { source, .. } | Error::Verify { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Classification of the underlying storage error; `Other` for non-storage errors
    pub fn category(&self) -> ErrorCategory {
        self.storage_error().map(classify).unwrap_or(ErrorCategory::Other)
    }

    pub fn is_critical(&self) -> bool {
        self.storage_error().is_some_and(classify::is_critical_error)
    }

    pub fn should_abort(&self) -> bool {
        self.storage_error().is_some_and(classify::should_abort)
    }

    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}
