//! # Warden
//!
//! A governance pipeline for runtime actions: capability-based permission
//! checks, append-only auditing with live subscription, and permission
//! recommendations mined from the audit trail.
//!
//! Warden sits between an agent (or any caller) and an execution backend.
//! Every action passes through one enforcement point that resolves the
//! caller's effective capabilities, consults the action catalog, records an
//! audit entry whether the call was allowed or denied, and only then lets
//! permitted actions reach the backend.
//!
//! ## Quick Start
//!
//! ```ignore
//! use warden_core::{Action, GovernancePipeline, HelperProcessBackend};
//!
//! #[tokio::main]
//! async fn main() -> warden_core::Result<()> {
//!     let pipeline = GovernancePipeline::builder()
//!         .backend(HelperProcessBackend::new("/usr/local/bin/cua-helper"))
//!         .build()?;
//!
//!     // Users start with no privileges; grant a role first.
//!     pipeline.permissions().assign_role("alice", "operator").await?;
//!
//!     let result = pipeline
//!         .execute_for_user(
//!             Action::new("click", serde_json::json!({"x": 100, "y": 200})),
//!             "alice",
//!         )
//!         .await?;
//!     println!("success: {}", result.success);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Capability Resolution**: roles and individual grants combined per
//!   call, with role-first attribution in the decision
//! - **Fail-Closed Enforcement**: unknown action types and missing
//!   capabilities are denied, never errored through to the backend
//! - **Append-Only Audit**: one entry per governed call, durable JSONL or
//!   in-memory, with monotonic timestamps
//! - **Live Subscription**: broadcast bus for audit entries and derived
//!   alerts (denials, execution failures)
//! - **Recommendations**: denial-pattern mining that proposes grants and
//!   role assignments for human approval
//!
//! ## Feature Flags
//!
//! - `test-utils` - expose [`test_utils::MockBackend`] to downstream tests

pub mod action;
pub mod audit;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod permission;
pub mod pipeline;
pub mod recommend;
pub mod role;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use action::{Action, ActionCatalog};
pub use audit::{
    ActionOutcome, AlertSeverity, AuditAlert, AuditBus, AuditEntry, AuditFilter, AuditLog,
    AuditLogError, AuditRecorder, FileAuditLog, MemoryAuditLog, DEFAULT_BUS_CAPACITY,
    RECENT_RETENTION,
};
pub use backend::{ActionBackend, BackendResponse, HelperProcessBackend};
pub use config::{ConfigError, GovernanceConfig};
pub use context::UserContext;
pub use error::{Error, Result};

// Permission system
pub use permission::{
    resolve, FilePermissionStore, GrantSource, MemoryPermissionStore, PermissionDecision,
    PermissionManager, PermissionStore, PermissionStoreError, UserPermissionRecord,
};
pub use pipeline::{
    ExecutionErrorKind, ExecutionResult, GovernancePipeline, GovernancePipelineBuilder,
    DEFAULT_BACKEND_TIMEOUT,
};
pub use recommend::{
    Confidence, Evidence, Recommendation, RecommendationAction, RecommendationEngine,
    RecommendationKind, DEFAULT_SCAN_WINDOW,
};
pub use role::{Role, RoleRegistry, RoleRegistryBuilder};
