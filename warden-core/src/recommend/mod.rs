//! Permission recommendations mined from the audit trail.
//!
//! The [`RecommendationEngine`] scans recent audit entries for denial
//! patterns and proposes permission changes an administrator can apply or
//! dismiss. Three patterns are detected:
//!
//! - a user repeatedly denied the same capability (individual grant)
//! - most members of a role denied a capability the role lacks (role gap)
//! - a user denied many distinct capabilities covered by an existing role
//!   (role assignment)
//!
//! Proposals never mutate permissions on their own; [`apply`] is the only
//! path from proposal to change, and role-definition changes are never
//! applied automatically.
//!
//! [`apply`]: RecommendationEngine::apply

mod engine;
mod types;

pub use engine::{RecommendationEngine, DEFAULT_SCAN_WINDOW};
pub use types::{
    Confidence, Evidence, Recommendation, RecommendationAction, RecommendationKind,
};
