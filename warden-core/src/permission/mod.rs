//! Permission system for governed action execution.
//!
//! This module decides who may do what. Users hold roles (named capability
//! bundles from the [`RoleRegistry`](crate::role::RoleRegistry)) plus
//! individual capability grants; the resolver combines both sources into a
//! single allow/deny decision with an attribution trail.
//!
//! # Overview
//!
//! - **[`resolve`]**: the pure permission decision
//! - **[`PermissionDecision`]**: allow/deny plus how the grant was obtained
//! - **[`PermissionManager`]**: validates and applies permission mutations
//! - **[`UserPermissionRecord`]**: one user's roles and grants
//! - **[`PermissionStore`]**: trait for persisting records
//! - **[`MemoryPermissionStore`]**: in-memory store (cleared on exit)
//! - **[`FilePermissionStore`]**: one JSON document per user on disk
//!
//! # Default Behavior
//!
//! Users without a stored record resolve to an empty record: no roles, no
//! grants, every governed action denied. This fail-open-to-nothing default
//! means first-time and anonymous callers need no provisioning step, while
//! unknown *action types* stay fail-closed for everyone.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_core::permission::{resolve, PermissionManager};
//! use warden_core::{ActionCatalog, RoleRegistry};
//!
//! # tokio_test::block_on(async {
//! let registry = Arc::new(RoleRegistry::with_defaults());
//! let catalog = ActionCatalog::with_defaults();
//! let manager = PermissionManager::new(Arc::clone(&registry));
//!
//! manager.assign_role("u1", "observer").await.unwrap();
//!
//! let ctx = manager.user_context("u1").await.unwrap();
//! assert!(resolve("screenshot", &ctx, &registry, &catalog).allowed);
//! assert!(!resolve("click", &ctx, &registry, &catalog).allowed);
//! # });
//! ```

mod manager;
mod record;
mod resolver;
mod store;

pub use manager::PermissionManager;
pub use record::UserPermissionRecord;
pub use resolver::{resolve, GrantSource, PermissionDecision};
pub use store::{
    FilePermissionStore, MemoryPermissionStore, PermissionStore, PermissionStoreError,
};
