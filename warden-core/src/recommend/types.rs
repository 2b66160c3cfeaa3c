//! Recommendation types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// What kind of permission change a recommendation proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Grant one capability to one user.
    GrantUserCapability,
    /// Add one capability to a role definition.
    AddRoleCapability,
    /// Assign an existing role to one user.
    AssignUserRole,
}

impl RecommendationKind {
    fn tag(&self) -> &'static str {
        match self {
            Self::GrantUserCapability => "grant_user_capability",
            Self::AddRoleCapability => "add_role_capability",
            Self::AssignUserRole => "assign_user_role",
        }
    }
}

/// How sure the engine is that the proposal is right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// The concrete permission change a recommendation proposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationAction {
    /// The user or role the change applies to.
    pub target: String,

    /// The capability involved, for capability-shaped proposals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,

    /// The role involved, for role-assignment proposals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A reference to one supporting audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Audit entry id.
    pub entry_id: String,
    /// Entry timestamp, milliseconds since the epoch.
    pub timestamp_ms: i64,
}

/// A human-approvable proposal to change permissions.
///
/// Ids are deterministic over (kind, subject), so re-scanning the same
/// audit data regenerates the same id - which is what makes dismissals
/// stick across scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Deterministic id.
    pub id: String,

    /// What change is proposed.
    #[serde(rename = "type")]
    pub kind: RecommendationKind,

    /// How sure the engine is.
    pub confidence: Confidence,

    /// 1 (lowest) to 10 (highest).
    pub priority: u8,

    /// The audit entries that triggered this proposal, oldest first.
    pub evidence: Vec<Evidence>,

    /// The proposed change.
    pub action: RecommendationAction,

    /// Whether `apply` can perform the change directly. Role-definition
    /// changes are deployment configuration and are never auto-executable.
    pub auto_executable: bool,
}

/// Deterministic recommendation id from the proposal's kind and subject.
pub(crate) fn recommendation_id(kind: RecommendationKind, subject: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", kind.tag(), subject).as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_deterministic() {
        let a = recommendation_id(RecommendationKind::GrantUserCapability, "u2/file.delete");
        let b = recommendation_id(RecommendationKind::GrantUserCapability, "u2/file.delete");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_id_varies_with_kind_and_subject() {
        let a = recommendation_id(RecommendationKind::GrantUserCapability, "u2/file.delete");
        let b = recommendation_id(RecommendationKind::AssignUserRole, "u2/file.delete");
        let c = recommendation_id(RecommendationKind::GrantUserCapability, "u2/file.read");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_value(RecommendationKind::GrantUserCapability).unwrap();
        assert_eq!(json, "grant_user_capability");
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
    }
}
