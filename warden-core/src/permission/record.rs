//! Per-user permission records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::context::UserContext;
use crate::role::RoleRegistry;

/// Everything the permission store knows about one user.
///
/// Records are created implicitly on first interaction: an unknown user is
/// indistinguishable from a user whose record is empty (no roles, no
/// grants). Records are never hard-deleted, only emptied.
///
/// Roles are additive only. Revoking a capability removes an individual
/// grant; it never subtracts a capability that arrives through a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissionRecord {
    /// Opaque user identifier.
    pub user_id: String,

    /// Assigned role names, in assignment order, without duplicates.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Individually granted capabilities.
    #[serde(default)]
    pub grants: BTreeSet<String>,
}

impl UserPermissionRecord {
    /// Create an empty record for a user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: Vec::new(),
            grants: BTreeSet::new(),
        }
    }

    /// Add a role. Returns `false` if already assigned (idempotent).
    pub fn assign_role(&mut self, role: &str) -> bool {
        if self.has_role(role) {
            return false;
        }
        self.roles.push(role.to_string());
        true
    }

    /// Remove a role. Returns `false` if it was not assigned.
    pub fn remove_role(&mut self, role: &str) -> bool {
        let before = self.roles.len();
        self.roles.retain(|r| r != role);
        self.roles.len() < before
    }

    /// True if the role is assigned.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Add an individual capability grant. Returns `false` if already granted.
    pub fn grant(&mut self, capability: &str) -> bool {
        self.grants.insert(capability.to_string())
    }

    /// Remove an individual capability grant. Returns `false` if not granted.
    pub fn revoke(&mut self, capability: &str) -> bool {
        self.grants.remove(capability)
    }

    /// True if the record carries no roles and no grants.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.grants.is_empty()
    }

    /// The union of role-derived capabilities and individual grants.
    ///
    /// Role names not present in the registry contribute nothing.
    pub fn effective_capabilities(&self, registry: &RoleRegistry) -> BTreeSet<String> {
        let mut caps = self.grants.clone();
        for role_name in &self.roles {
            if let Some(role) = registry.get(role_name) {
                caps.extend(role.capabilities.iter().cloned());
            }
        }
        caps
    }

    /// Build the per-call [`UserContext`] for this record.
    pub fn context(&self) -> UserContext {
        UserContext {
            user_id: self.user_id.clone(),
            roles: self.roles.clone(),
            capabilities: self.grants.clone(),
        }
    }
}
