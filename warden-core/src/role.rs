//! Roles and the role registry.
//!
//! A role is a named bundle of capabilities, assigned wholesale to users.
//! Role definitions are deployment configuration: the registry is built once
//! at startup and never mutated afterwards, which keeps the trusted
//! permission vocabulary auditable outside the running process.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A named, immutable set of capabilities.
///
/// Role names are case-sensitive and unique within a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique role name.
    pub name: String,

    /// Capabilities granted by this role.
    pub capabilities: BTreeSet<String>,
}

impl Role {
    /// Create a role from a name and capability list.
    pub fn new<I, S>(name: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }

    /// True if this role grants the given capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Lookup table of role definitions, fixed after construction.
///
/// # Example
///
/// ```rust
/// use warden_core::RoleRegistry;
///
/// let registry = RoleRegistry::builder()
///     .role("analyst", ["file.read", "api.call"])
///     .build();
///
/// assert!(registry.contains("analyst"));
/// assert!(registry.get("analyst").unwrap().has_capability("file.read"));
/// assert!(!registry.contains("Analyst")); // names are case-sensitive
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: BTreeMap<String, Role>,
}

impl RoleRegistry {
    /// Create a registry with no roles.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in desktop automation roles.
    ///
    /// - `observer`: screen capture only
    /// - `operator`: screen capture plus pointer, keyboard, and wait
    pub fn with_defaults() -> Self {
        Self::builder()
            .role("observer", ["screen.capture"])
            .role(
                "operator",
                ["screen.capture", "input.pointer", "input.keyboard", "agent.wait"],
            )
            .build()
    }

    /// Start building a registry.
    pub fn builder() -> RoleRegistryBuilder {
        RoleRegistryBuilder::default()
    }

    /// Look up a role by name.
    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// All roles, sorted by name.
    pub fn list(&self) -> Vec<&Role> {
        self.roles.values().collect()
    }

    /// True if a role with this exact name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Number of defined roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// True if no roles are defined.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Builder for [`RoleRegistry`].
///
/// Registering the same name twice replaces the earlier definition, so the
/// unique-name invariant holds by construction.
#[derive(Debug, Default)]
pub struct RoleRegistryBuilder {
    roles: BTreeMap<String, Role>,
}

impl RoleRegistryBuilder {
    /// Define a role from a name and capability list.
    pub fn role<I, S>(mut self, name: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let role = Role::new(name, capabilities);
        self.roles.insert(role.name.clone(), role);
        self
    }

    /// Add an already-constructed role definition.
    pub fn add(mut self, role: Role) -> Self {
        self.roles.insert(role.name.clone(), role);
        self
    }

    /// Finalize the registry.
    pub fn build(self) -> RoleRegistry {
        RoleRegistry { roles: self.roles }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_has_capability() {
        let role = Role::new("analyst", ["file.read", "api.call"]);
        assert!(role.has_capability("file.read"));
        assert!(!role.has_capability("file.write"));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = RoleRegistry::builder()
            .role("analyst", ["file.read"])
            .build();

        assert!(registry.contains("analyst"));
        assert!(registry.get("analyst").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_registry_names_case_sensitive() {
        let registry = RoleRegistry::builder().role("Admin", ["x"]).build();
        assert!(registry.contains("Admin"));
        assert!(!registry.contains("admin"));
    }

    #[test]
    fn test_duplicate_name_replaces() {
        let registry = RoleRegistry::builder()
            .role("dup", ["a"])
            .role("dup", ["b"])
            .build();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("dup").unwrap().has_capability("b"));
        assert!(!registry.get("dup").unwrap().has_capability("a"));
    }

    #[test]
    fn test_default_roles() {
        let registry = RoleRegistry::with_defaults();
        assert!(registry.contains("observer"));
        assert!(registry.contains("operator"));

        let operator = registry.get("operator").unwrap();
        assert!(operator.has_capability("input.pointer"));

        let observer = registry.get("observer").unwrap();
        assert!(!observer.has_capability("input.pointer"));
    }

    #[test]
    fn test_list_sorted_by_name() {
        let registry = RoleRegistry::builder()
            .role("zeta", ["z"])
            .role("alpha", ["a"])
            .build();

        let names: Vec<_> = registry.list().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
