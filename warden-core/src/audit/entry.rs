//! Audit entry types and query filters.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::permission::PermissionDecision;

/// Outcome of a governed call's execution phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Whether the action executed successfully. Always `false` for
    /// denials, which never reach the backend.
    pub success: bool,

    /// Error message for failures and denials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    /// A successful execution.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failed execution (or a denial that never executed).
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// One immutable record of a governed call.
///
/// Created exactly once per call, after the decision is known and, for
/// allowed actions, after the backend has finished or failed. Entries are
/// append-only; the log is never rewritten in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry id.
    pub id: String,

    /// Milliseconds since the Unix epoch; monotonically non-decreasing
    /// across entries from one recorder.
    pub timestamp_ms: i64,

    /// The user the call ran under.
    pub user_id: String,

    /// The requested action.
    pub action: Action,

    /// The permission decision made for this call.
    pub permission: PermissionDecision,

    /// The execution outcome.
    pub result: ActionOutcome,
}

impl AuditEntry {
    /// True if the call was denied by the resolver.
    pub fn is_denial(&self) -> bool {
        !self.permission.allowed
    }

    /// True if the call was allowed but execution failed.
    pub fn is_execution_failure(&self) -> bool {
        self.permission.allowed && !self.result.success
    }
}

/// Filter for audit queries. All criteria are conjunctive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    /// Only entries for this user.
    pub user_id: Option<String>,

    /// Only entries for this action type.
    pub action_type: Option<String>,

    /// At most this many entries (most recent first).
    pub limit: Option<usize>,
}

impl AuditFilter {
    /// Filter by user id.
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Filter by action type.
    pub fn action_type(mut self, action_type: impl Into<String>) -> Self {
        self.action_type = Some(action_type.into());
        self
    }

    /// Cap the number of returned entries.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True if the entry satisfies the user/action criteria.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(user_id) = &self.user_id {
            if &entry.user_id != user_id {
                return false;
            }
        }
        if let Some(action_type) = &self.action_type {
            if &entry.action.action_type != action_type {
                return false;
            }
        }
        true
    }
}
