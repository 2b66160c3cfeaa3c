//! User permission management.
//!
//! The manager owns all mutation of user permission records and validates
//! role names against the registry before touching the store. Reads issued
//! after a completed mutation always observe that mutation: every call goes
//! through the store, there is no caching layer in between.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use super::record::UserPermissionRecord;
use super::store::{MemoryPermissionStore, PermissionStore};
use crate::context::UserContext;
use crate::error::{Error, Result};
use crate::role::RoleRegistry;

/// Validates and applies permission mutations against a [`PermissionStore`].
///
/// # Example
///
/// ```rust
/// use warden_core::{PermissionManager, RoleRegistry};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let registry = Arc::new(RoleRegistry::with_defaults());
/// let manager = PermissionManager::new(registry);
///
/// manager.assign_role("u1", "operator").await.unwrap();
/// assert_eq!(manager.roles_of("u1").await.unwrap(), vec!["operator"]);
///
/// // Unknown roles are rejected before any mutation
/// assert!(manager.assign_role("u1", "root").await.is_err());
/// # });
/// ```
pub struct PermissionManager {
    registry: Arc<RoleRegistry>,
    store: Box<dyn PermissionStore>,
}

impl PermissionManager {
    /// Create a manager backed by an in-memory store.
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self::with_store(registry, MemoryPermissionStore::new())
    }

    /// Create a manager with a custom store.
    pub fn with_store(
        registry: Arc<RoleRegistry>,
        store: impl PermissionStore + 'static,
    ) -> Self {
        Self {
            registry,
            store: Box::new(store),
        }
    }

    /// Create a manager with a boxed store.
    pub fn with_boxed_store(registry: Arc<RoleRegistry>, store: Box<dyn PermissionStore>) -> Self {
        Self { registry, store }
    }

    /// The role registry this manager validates against.
    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Load a user's record, falling back to an implicit empty record.
    ///
    /// Unknown users deliberately resolve to "no privileges" rather than an
    /// error, so anonymous and first-time callers need no special casing.
    pub async fn record(&self, user_id: &str) -> Result<UserPermissionRecord> {
        Ok(self
            .store
            .load(user_id)
            .await?
            .unwrap_or_else(|| UserPermissionRecord::new(user_id)))
    }

    /// Assign a role to a user. Idempotent; fails if the role is unknown.
    pub async fn assign_role(&self, user_id: &str, role: &str) -> Result<()> {
        if !self.registry.contains(role) {
            return Err(Error::InvalidRole(role.to_string()));
        }
        let mut record = self.record(user_id).await?;
        if record.assign_role(role) {
            self.store.save(record).await?;
            info!(user_id, role, "role assigned");
        }
        Ok(())
    }

    /// Remove a role from a user. No-op if the role was not assigned.
    pub async fn remove_role(&self, user_id: &str, role: &str) -> Result<()> {
        let mut record = self.record(user_id).await?;
        if record.remove_role(role) {
            self.store.save(record).await?;
            info!(user_id, role, "role removed");
        }
        Ok(())
    }

    /// Grant an individual capability to a user. Idempotent.
    pub async fn grant_capability(&self, user_id: &str, capability: &str) -> Result<()> {
        let mut record = self.record(user_id).await?;
        if record.grant(capability) {
            self.store.save(record).await?;
            info!(user_id, capability, "capability granted");
        }
        Ok(())
    }

    /// Revoke an individual capability from a user. Idempotent.
    ///
    /// Only individual grants are removed; capabilities arriving through a
    /// role are unaffected.
    pub async fn revoke_capability(&self, user_id: &str, capability: &str) -> Result<()> {
        let mut record = self.record(user_id).await?;
        if record.revoke(capability) {
            self.store.save(record).await?;
            info!(user_id, capability, "capability revoked");
        }
        Ok(())
    }

    /// The roles assigned to a user, in assignment order.
    pub async fn roles_of(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self.record(user_id).await?.roles)
    }

    /// A user's individual capability grants (not role-derived).
    pub async fn capabilities_of(&self, user_id: &str) -> Result<BTreeSet<String>> {
        Ok(self.record(user_id).await?.grants)
    }

    /// All known users with their roles and grants.
    pub async fn list_users(&self) -> Result<Vec<UserPermissionRecord>> {
        Ok(self.store.load_all().await?)
    }

    /// Build the per-call [`UserContext`] for a user from stored state.
    pub async fn user_context(&self, user_id: &str) -> Result<UserContext> {
        Ok(self.record(user_id).await?.context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PermissionManager {
        let registry = Arc::new(
            RoleRegistry::builder()
                .role("analyst", ["file.read", "api.call"])
                .role("admin", ["file.read", "file.write"])
                .build(),
        );
        PermissionManager::new(registry)
    }

    #[tokio::test]
    async fn test_unknown_user_has_empty_record() {
        let manager = manager();
        assert!(manager.roles_of("ghost").await.unwrap().is_empty());
        assert!(manager.capabilities_of("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_role_validates_registry() {
        let manager = manager();
        let err = manager.assign_role("u1", "root").await.unwrap_err();
        assert!(err.is_invalid_role());
        // Nothing was written
        assert!(manager.roles_of("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_role_idempotent() {
        let manager = manager();
        manager.assign_role("u1", "admin").await.unwrap();
        manager.assign_role("u1", "admin").await.unwrap();
        assert_eq!(manager.roles_of("u1").await.unwrap(), vec!["admin"]);
    }

    #[tokio::test]
    async fn test_remove_role_noop_when_absent() {
        let manager = manager();
        manager.remove_role("u1", "admin").await.unwrap();
        manager.assign_role("u1", "admin").await.unwrap();
        manager.remove_role("u1", "admin").await.unwrap();
        assert!(manager.roles_of("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grant_and_revoke_capability() {
        let manager = manager();
        manager.grant_capability("u1", "file.delete").await.unwrap();
        assert!(manager
            .capabilities_of("u1")
            .await
            .unwrap()
            .contains("file.delete"));

        manager.revoke_capability("u1", "file.delete").await.unwrap();
        assert!(manager.capabilities_of("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutation_visible_to_next_read() {
        let manager = manager();
        manager.grant_capability("u1", "file.read").await.unwrap();
        let ctx = manager.user_context("u1").await.unwrap();
        assert!(ctx.capabilities.contains("file.read"));
    }

    #[tokio::test]
    async fn test_list_users() {
        let manager = manager();
        manager.assign_role("u1", "analyst").await.unwrap();
        manager.grant_capability("u2", "file.write").await.unwrap();

        let users = manager.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn test_emptied_record_is_not_deleted() {
        let manager = manager();
        manager.assign_role("u1", "analyst").await.unwrap();
        manager.remove_role("u1", "analyst").await.unwrap();

        let users = manager.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].is_empty());
    }
}
