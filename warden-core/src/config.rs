//! Deployment configuration for roles and the action catalog.
//!
//! Role definitions and action→capability mappings live outside the running
//! process, in a JSON file loaded once at startup:
//!
//! ```json
//! {
//!   "roles": [
//!     {"name": "analyst", "capabilities": ["file.read", "api.call"]}
//!   ],
//!   "actions": [
//!     {"type": "file.read", "capability": "file.read"}
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::ActionCatalog;
use crate::role::{Role, RoleRegistry};

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One role definition in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Unique role name.
    pub name: String,
    /// Capabilities granted by the role.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// One action-type mapping in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMapping {
    /// Action type as requested by callers.
    #[serde(rename = "type")]
    pub action_type: String,
    /// Capability required to execute it.
    pub capability: String,
}

/// Full governance configuration: role vocabulary plus action catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Role definitions.
    #[serde(default)]
    pub roles: Vec<RoleConfig>,
    /// Action-type → capability entries.
    #[serde(default)]
    pub actions: Vec<ActionMapping>,
}

impl GovernanceConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the role registry described by this configuration.
    pub fn role_registry(&self) -> RoleRegistry {
        let mut builder = RoleRegistry::builder();
        for role in &self.roles {
            builder = builder.add(Role::new(&role.name, role.capabilities.clone()));
        }
        builder.build()
    }

    /// Build the action catalog described by this configuration.
    pub fn action_catalog(&self) -> ActionCatalog {
        let mut catalog = ActionCatalog::empty();
        for mapping in &self.actions {
            catalog = catalog.with_action(&mapping.action_type, &mapping.capability);
        }
        catalog
    }
}
