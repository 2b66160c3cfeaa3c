//! The governance pipeline.
//!
//! Single point of enforcement: every action reaches the backend through
//! [`GovernancePipeline::execute`] and nowhere else. The sequence is
//! resolve → (deny ⇒ record + structured denial) → timed backend call →
//! record → verbatim result, producing exactly one audit entry per call.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::action::{Action, ActionCatalog};
use crate::audit::{ActionOutcome, AuditLog, AuditRecorder};
use crate::backend::{ActionBackend, BackendResponse};
use crate::context::UserContext;
use crate::error::{Error, Result};
use crate::permission::{resolve, PermissionManager, PermissionStore};
use crate::role::RoleRegistry;

/// Default time bound on the backend call.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Distinguishable failure categories in an [`ExecutionResult`].
///
/// A client must never confuse "you may not do this" with "the system is
/// down"; the kind makes the difference machine-readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    /// The resolver denied the action.
    PermissionDenied,
    /// The backend reported a failure or is unavailable.
    BackendError,
    /// The backend did not respond within the timeout.
    BackendTimeout,
}

/// The caller-facing result of a governed call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the action was allowed and executed successfully.
    pub success: bool,

    /// Backend payload, passed through verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error message for denials and failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// What category of failure occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ExecutionErrorKind>,
}

impl ExecutionResult {
    fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            error_kind: None,
        }
    }

    fn denied(reason: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(format!("Permission denied: {}", reason)),
            error_kind: Some(ExecutionErrorKind::PermissionDenied),
        }
    }

    fn failed(error: String, kind: ExecutionErrorKind) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            error_kind: Some(kind),
        }
    }

    /// True if the call was denied by the resolver.
    pub fn is_denied(&self) -> bool {
        self.error_kind == Some(ExecutionErrorKind::PermissionDenied)
    }
}

/// Orchestrates resolver, backend, and recorder for every governed call.
///
/// # Example
///
/// ```rust,no_run
/// use warden_core::{Action, GovernancePipeline, HelperProcessBackend};
///
/// # async fn example() -> warden_core::Result<()> {
/// let pipeline = GovernancePipeline::builder()
///     .backend(HelperProcessBackend::new("/usr/local/bin/cua-helper"))
///     .build()?;
///
/// pipeline.permissions().assign_role("u1", "operator").await?;
///
/// let result = pipeline
///     .execute_for_user(Action::new("click", serde_json::json!({"x": 10, "y": 20})), "u1")
///     .await?;
/// assert!(result.success);
/// # Ok(())
/// # }
/// ```
pub struct GovernancePipeline {
    registry: Arc<RoleRegistry>,
    catalog: ActionCatalog,
    permissions: PermissionManager,
    recorder: AuditRecorder,
    backend: Box<dyn ActionBackend>,
    backend_timeout: Duration,
}

impl GovernancePipeline {
    /// Start building a pipeline.
    pub fn builder() -> GovernancePipelineBuilder {
        GovernancePipelineBuilder::default()
    }

    /// The role registry in use.
    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// The action catalog in use.
    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    /// The permission manager owning user permission state.
    pub fn permissions(&self) -> &PermissionManager {
        &self.permissions
    }

    /// The audit recorder for queries and live subscription.
    pub fn recorder(&self) -> &AuditRecorder {
        &self.recorder
    }

    /// Whether the backend is currently able to execute actions.
    pub async fn backend_healthy(&self) -> bool {
        self.backend.health_check().await
    }

    /// Execute a governed call under an explicit, caller-supplied context.
    ///
    /// Returns `Err` only for system faults (a failed audit write); denials
    /// and backend failures are normal outcomes inside the result.
    pub async fn execute(&self, action: Action, ctx: UserContext) -> Result<ExecutionResult> {
        let decision = resolve(&action.action_type, &ctx, &self.registry, &self.catalog);

        if !decision.allowed {
            let reason = decision
                .reason
                .clone()
                .unwrap_or_else(|| "not permitted".to_string());
            warn!(
                user_id = %ctx.user_id,
                action_type = %action.action_type,
                %reason,
                "action denied"
            );
            self.recorder
                .record(
                    &action,
                    &ctx,
                    decision,
                    ActionOutcome::failed(format!("Permission denied: {}", reason)),
                )
                .await?;
            return Ok(ExecutionResult::denied(&reason));
        }

        let (response, timed_out) =
            match tokio::time::timeout(self.backend_timeout, self.backend.execute(&action)).await {
                Ok(response) => (response, false),
                Err(_) => (
                    BackendResponse::err(format!(
                        "backend timed out after {:?}",
                        self.backend_timeout
                    )),
                    true,
                ),
            };

        let outcome = if response.success {
            ActionOutcome::ok()
        } else {
            ActionOutcome::failed(
                response
                    .error
                    .clone()
                    .unwrap_or_else(|| "backend failure".to_string()),
            )
        };
        // The audit write gates the response: a permitted action whose
        // entry cannot be persisted is an error, not a success.
        self.recorder.record(&action, &ctx, decision, outcome).await?;

        if response.success {
            info!(
                user_id = %ctx.user_id,
                action_type = %action.action_type,
                "action executed"
            );
            Ok(ExecutionResult::ok(response.data))
        } else {
            let kind = if timed_out {
                ExecutionErrorKind::BackendTimeout
            } else {
                ExecutionErrorKind::BackendError
            };
            Ok(ExecutionResult::failed(
                response.error.unwrap_or_else(|| "backend failure".to_string()),
                kind,
            ))
        }
    }

    /// Execute a governed call, resolving the user's context from the
    /// permission store.
    pub async fn execute_for_user(
        &self,
        action: Action,
        user_id: &str,
    ) -> Result<ExecutionResult> {
        let ctx = self.permissions.user_context(user_id).await?;
        self.execute(action, ctx).await
    }
}

/// Builder for [`GovernancePipeline`].
#[derive(Default)]
pub struct GovernancePipelineBuilder {
    registry: Option<RoleRegistry>,
    catalog: Option<ActionCatalog>,
    store: Option<Box<dyn PermissionStore>>,
    log: Option<Box<dyn AuditLog>>,
    backend: Option<Box<dyn ActionBackend>>,
    backend_timeout: Duration,
}

impl GovernancePipelineBuilder {
    /// Use a specific role registry (defaults to the built-in roles).
    pub fn registry(mut self, registry: RoleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a specific action catalog (defaults to the built-in vocabulary).
    pub fn catalog(mut self, catalog: ActionCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Use a specific permission store (defaults to in-memory).
    pub fn permission_store(mut self, store: impl PermissionStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Use a specific audit log (defaults to in-memory).
    pub fn audit_log(mut self, log: impl AuditLog + 'static) -> Self {
        self.log = Some(Box::new(log));
        self
    }

    /// Set the execution backend (required).
    pub fn backend(mut self, backend: impl ActionBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Time bound on backend calls (defaults to
    /// [`DEFAULT_BACKEND_TIMEOUT`]). Expiry is reported as a backend
    /// failure, never a permission failure.
    pub fn backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no backend was configured.
    pub fn build(self) -> Result<GovernancePipeline> {
        let backend = self
            .backend
            .ok_or_else(|| Error::Config("no backend configured".to_string()))?;
        let registry = Arc::new(self.registry.unwrap_or_else(RoleRegistry::with_defaults));
        let permissions = match self.store {
            Some(store) => PermissionManager::with_boxed_store(Arc::clone(&registry), store),
            None => PermissionManager::new(Arc::clone(&registry)),
        };
        let recorder = match self.log {
            Some(log) => AuditRecorder::with_log(BoxedLog(log)),
            None => AuditRecorder::new(),
        };
        let backend_timeout = if self.backend_timeout.is_zero() {
            DEFAULT_BACKEND_TIMEOUT
        } else {
            self.backend_timeout
        };
        Ok(GovernancePipeline {
            registry,
            catalog: self.catalog.unwrap_or_else(ActionCatalog::with_defaults),
            permissions,
            recorder,
            backend,
            backend_timeout,
        })
    }
}

/// Adapter so a boxed log can feed `AuditRecorder::with_log`.
struct BoxedLog(Box<dyn AuditLog>);

#[async_trait::async_trait]
impl AuditLog for BoxedLog {
    async fn append(
        &self,
        entry: &crate::audit::AuditEntry,
    ) -> std::result::Result<(), crate::audit::AuditLogError> {
        self.0.append(entry).await
    }

    async fn query(
        &self,
        filter: &crate::audit::AuditFilter,
    ) -> std::result::Result<Vec<crate::audit::AuditEntry>, crate::audit::AuditLogError> {
        self.0.query(filter).await
    }
}
