//! Per-call user context.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The identity and privileges a governed call runs under.
///
/// Constructed once at the pipeline boundary and never mutated mid-flight.
/// `capabilities` holds only the user's *individual* grants; role-derived
/// capabilities are resolved against the registry at decision time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// Opaque user identifier.
    pub user_id: String,

    /// Assigned role names, in assignment order.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Individually granted capabilities (not role-derived).
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
}

impl UserContext {
    /// Context for a user with no roles and no individual grants.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: Vec::new(),
            capabilities: BTreeSet::new(),
        }
    }

    /// Set the assigned roles.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Set the individual capability grants.
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_unprivileged() {
        let ctx = UserContext::new("u1");
        assert_eq!(ctx.user_id, "u1");
        assert!(ctx.roles.is_empty());
        assert!(ctx.capabilities.is_empty());
    }

    #[test]
    fn test_builders() {
        let ctx = UserContext::new("u1")
            .with_roles(["analyst"])
            .with_capabilities(["file.write"]);
        assert_eq!(ctx.roles, vec!["analyst"]);
        assert!(ctx.capabilities.contains("file.write"));
    }

    #[test]
    fn test_roles_preserve_order() {
        let ctx = UserContext::new("u1").with_roles(["zeta", "alpha"]);
        assert_eq!(ctx.roles, vec!["zeta", "alpha"]);
    }
}
