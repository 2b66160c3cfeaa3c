//! The permission decision.
//!
//! [`resolve`] is a pure function: identical inputs always yield identical
//! decisions. This keeps denials explainable and the decision logic
//! testable without any store or backend attached.

use serde::{Deserialize, Serialize};

use crate::action::ActionCatalog;
use crate::context::UserContext;
use crate::role::RoleRegistry;

/// Where an allowed capability came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    /// Granted through an assigned role.
    Role,
    /// Granted individually to the user.
    Individual,
    /// Not granted (the decision is a denial).
    None,
}

/// The outcome of resolving one action against one user context.
///
/// Computed fresh per call and embedded into the audit entry; never
/// persisted independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecision {
    /// Whether the action may proceed.
    pub allowed: bool,

    /// The capability the action requires, or `None` for unknown action
    /// types (which are denied before any capability is consulted).
    pub required_capability: Option<String>,

    /// How the capability was granted.
    pub granted_by: GrantSource,

    /// The role that granted the capability, when `granted_by` is `Role`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,

    /// Human-readable explanation for denials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PermissionDecision {
    fn allowed_by_role(capability: &str, role_name: &str) -> Self {
        Self {
            allowed: true,
            required_capability: Some(capability.to_string()),
            granted_by: GrantSource::Role,
            role_name: Some(role_name.to_string()),
            reason: None,
        }
    }

    fn allowed_individually(capability: &str) -> Self {
        Self {
            allowed: true,
            required_capability: Some(capability.to_string()),
            granted_by: GrantSource::Individual,
            role_name: None,
            reason: None,
        }
    }

    fn denied(required_capability: Option<&str>, reason: String) -> Self {
        Self {
            allowed: false,
            required_capability: required_capability.map(String::from),
            granted_by: GrantSource::None,
            role_name: None,
            reason: Some(reason),
        }
    }
}

/// Decide whether `action_type` may proceed under `ctx`.
///
/// Unknown action types are denied unconditionally, even for a caller
/// holding every capability ever defined: an unrecognized action is never
/// permitted. Role-granted capabilities are attributed to the first
/// matching role in assignment order; individual grants are consulted only
/// when no role matches.
pub fn resolve(
    action_type: &str,
    ctx: &UserContext,
    registry: &RoleRegistry,
    catalog: &ActionCatalog,
) -> PermissionDecision {
    let Some(required) = catalog.required_capability(action_type) else {
        return PermissionDecision::denied(
            None,
            format!("Unknown action type: {}", action_type),
        );
    };

    for role_name in &ctx.roles {
        if let Some(role) = registry.get(role_name) {
            if role.has_capability(required) {
                return PermissionDecision::allowed_by_role(required, role_name);
            }
        }
    }

    if ctx.capabilities.contains(required) {
        return PermissionDecision::allowed_individually(required);
    }

    PermissionDecision::denied(
        Some(required),
        format!("Missing required capability: {}", required),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::RoleRegistry;

    fn fixtures() -> (RoleRegistry, ActionCatalog) {
        let registry = RoleRegistry::builder()
            .role("analyst", ["file.read", "api.call"])
            .role("admin", ["file.read", "file.write"])
            .build();
        let catalog = ActionCatalog::empty()
            .with_action("file.read", "file.read")
            .with_action("file.write", "file.write")
            .with_action("api.call", "api.call");
        (registry, catalog)
    }

    #[test]
    fn test_role_grant_with_attribution() {
        let (registry, catalog) = fixtures();
        let ctx = UserContext::new("u1").with_roles(["analyst"]);

        let decision = resolve("api.call", &ctx, &registry, &catalog);
        assert!(decision.allowed);
        assert_eq!(decision.granted_by, GrantSource::Role);
        assert_eq!(decision.role_name.as_deref(), Some("analyst"));
        assert_eq!(decision.required_capability.as_deref(), Some("api.call"));
    }

    #[test]
    fn test_first_matching_role_wins_attribution() {
        let (registry, catalog) = fixtures();
        // Both roles carry file.read; assignment order decides attribution.
        let ctx = UserContext::new("u1").with_roles(["admin", "analyst"]);
        let decision = resolve("file.read", &ctx, &registry, &catalog);
        assert_eq!(decision.role_name.as_deref(), Some("admin"));

        let ctx = UserContext::new("u1").with_roles(["analyst", "admin"]);
        let decision = resolve("file.read", &ctx, &registry, &catalog);
        assert_eq!(decision.role_name.as_deref(), Some("analyst"));
    }

    #[test]
    fn test_individual_grant() {
        let (registry, catalog) = fixtures();
        let ctx = UserContext::new("u1").with_capabilities(["file.write"]);

        let decision = resolve("file.write", &ctx, &registry, &catalog);
        assert!(decision.allowed);
        assert_eq!(decision.granted_by, GrantSource::Individual);
        assert!(decision.role_name.is_none());
    }

    #[test]
    fn test_role_preferred_over_individual_attribution() {
        let (registry, catalog) = fixtures();
        let ctx = UserContext::new("u1")
            .with_roles(["analyst"])
            .with_capabilities(["file.read"]);

        let decision = resolve("file.read", &ctx, &registry, &catalog);
        assert_eq!(decision.granted_by, GrantSource::Role);
    }

    #[test]
    fn test_denied_mentions_capability() {
        let (registry, catalog) = fixtures();
        let ctx = UserContext::new("u1").with_roles(["analyst"]);

        let decision = resolve("file.write", &ctx, &registry, &catalog);
        assert!(!decision.allowed);
        assert_eq!(decision.granted_by, GrantSource::None);
        assert!(decision.reason.as_deref().unwrap().contains("file.write"));
    }

    #[test]
    fn test_unknown_action_type_always_denied() {
        let (registry, catalog) = fixtures();
        // A caller with every capability ever defined is still denied.
        let ctx = UserContext::new("u1")
            .with_roles(["admin", "analyst"])
            .with_capabilities(["file.read", "file.write", "api.call"]);

        let decision = resolve("disk.format", &ctx, &registry, &catalog);
        assert!(!decision.allowed);
        assert!(decision.required_capability.is_none());
        assert!(decision.reason.as_deref().unwrap().contains("Unknown action type"));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let (registry, catalog) = fixtures();
        let ctx = UserContext::new("u1")
            .with_roles(["analyst"])
            .with_capabilities(["file.write"]);

        let first = resolve("file.read", &ctx, &registry, &catalog);
        for _ in 0..10 {
            assert_eq!(resolve("file.read", &ctx, &registry, &catalog), first);
        }
    }

    #[test]
    fn test_unassigned_role_in_context_is_ignored() {
        let (registry, catalog) = fixtures();
        let ctx = UserContext::new("u1").with_roles(["ghost-role"]);
        let decision = resolve("file.read", &ctx, &registry, &catalog);
        assert!(!decision.allowed);
    }

    #[test]
    fn test_decision_serialization() {
        let (registry, catalog) = fixtures();
        let ctx = UserContext::new("u1").with_roles(["analyst"]);
        let decision = resolve("api.call", &ctx, &registry, &catalog);

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["granted_by"], "role");
        assert_eq!(json["role_name"], "analyst");
    }
}
