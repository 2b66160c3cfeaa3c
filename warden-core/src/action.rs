//! Actions and the action-type → capability catalog.
//!
//! An [`Action`] is a transient request constructed per call: a string type
//! plus an opaque JSON parameter payload. The [`ActionCatalog`] is static
//! configuration mapping each known action type to the capability required
//! to execute it. Action types absent from the catalog are denied by the
//! resolver regardless of the caller's privileges (fail-closed).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single requested operation.
///
/// # Example
///
/// ```rust
/// use warden_core::Action;
///
/// let action = Action::new("click", serde_json::json!({"x": 120, "y": 300}));
/// assert_eq!(action.action_type, "click");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// The action type, matched against the catalog.
    #[serde(rename = "type")]
    pub action_type: String,

    /// Opaque key-value payload passed through to the backend.
    #[serde(default = "empty_params")]
    pub params: Value,
}

fn empty_params() -> Value {
    Value::Object(Default::default())
}

impl Action {
    /// Create an action with parameters.
    pub fn new(action_type: impl Into<String>, params: Value) -> Self {
        Self {
            action_type: action_type.into(),
            params,
        }
    }

    /// Create an action with an empty parameter payload.
    pub fn bare(action_type: impl Into<String>) -> Self {
        Self::new(action_type, empty_params())
    }
}

/// Static mapping from action types to required capabilities.
///
/// Loaded once at startup; the mapping may be N:1 (several action types
/// sharing one capability). The default catalog covers the desktop
/// automation vocabulary understood by [`HelperProcessBackend`].
///
/// [`HelperProcessBackend`]: crate::backend::HelperProcessBackend
///
/// # Example
///
/// ```rust
/// use warden_core::ActionCatalog;
///
/// let catalog = ActionCatalog::with_defaults()
///     .with_action("file.read", "file.read");
///
/// assert_eq!(catalog.required_capability("click"), Some("input.pointer"));
/// assert_eq!(catalog.required_capability("file.read"), Some("file.read"));
/// assert_eq!(catalog.required_capability("rm_rf"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    entries: BTreeMap<String, String>,
}

impl ActionCatalog {
    /// Create an empty catalog. Every action type is unknown (and therefore
    /// denied) until registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a catalog with the built-in desktop automation vocabulary.
    ///
    /// | Action types | Capability |
    /// |---|---|
    /// | `screenshot` | `screen.capture` |
    /// | `click`, `move`, `scroll` | `input.pointer` |
    /// | `type`, `key` | `input.keyboard` |
    /// | `wait` | `agent.wait` |
    pub fn with_defaults() -> Self {
        Self::empty()
            .with_action("screenshot", "screen.capture")
            .with_action("click", "input.pointer")
            .with_action("move", "input.pointer")
            .with_action("scroll", "input.pointer")
            .with_action("type", "input.keyboard")
            .with_action("key", "input.keyboard")
            .with_action("wait", "agent.wait")
    }

    /// Register an action type and its required capability.
    pub fn with_action(
        mut self,
        action_type: impl Into<String>,
        capability: impl Into<String>,
    ) -> Self {
        self.entries.insert(action_type.into(), capability.into());
        self
    }

    /// The capability required to execute an action type, or `None` if the
    /// action type is unknown.
    pub fn required_capability(&self, action_type: &str) -> Option<&str> {
        self.entries.get(action_type).map(String::as_str)
    }

    /// All registered action types with their capabilities, in sorted order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, c)| (t.as_str(), c.as_str()))
    }

    /// The distinct set of capabilities referenced by the catalog.
    pub fn capabilities(&self) -> BTreeSet<String> {
        self.entries.values().cloned().collect()
    }

    /// Number of registered action types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no action types are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serialization() {
        let action = Action::new("click", serde_json::json!({"x": 1, "y": 2}));
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "click");
        assert_eq!(json["params"]["x"], 1);

        let parsed: Action = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.action_type, "click");
    }

    #[test]
    fn test_action_params_default_to_empty_object() {
        let parsed: Action = serde_json::from_str(r#"{"type": "screenshot"}"#).unwrap();
        assert!(parsed.params.is_object());
    }

    #[test]
    fn test_default_catalog_mappings() {
        let catalog = ActionCatalog::with_defaults();
        assert_eq!(catalog.required_capability("screenshot"), Some("screen.capture"));
        assert_eq!(catalog.required_capability("click"), Some("input.pointer"));
        assert_eq!(catalog.required_capability("move"), Some("input.pointer"));
        assert_eq!(catalog.required_capability("scroll"), Some("input.pointer"));
        assert_eq!(catalog.required_capability("type"), Some("input.keyboard"));
        assert_eq!(catalog.required_capability("key"), Some("input.keyboard"));
        assert_eq!(catalog.required_capability("wait"), Some("agent.wait"));
    }

    #[test]
    fn test_unknown_action_type() {
        let catalog = ActionCatalog::with_defaults();
        assert_eq!(catalog.required_capability("file.delete"), None);
    }

    #[test]
    fn test_with_action_extends_catalog() {
        let catalog = ActionCatalog::empty().with_action("file.read", "file.read");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.required_capability("file.read"), Some("file.read"));
    }

    #[test]
    fn test_capabilities_deduplicates() {
        let catalog = ActionCatalog::with_defaults();
        let caps = catalog.capabilities();
        // click/move/scroll collapse into input.pointer, type/key into input.keyboard
        assert_eq!(caps.len(), 4);
        assert!(caps.contains("input.pointer"));
    }
}
