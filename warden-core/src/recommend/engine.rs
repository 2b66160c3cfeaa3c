//! Denial-pattern mining over the audit trail.
//!
//! The engine scans recent audit entries for recurring denial patterns and
//! turns them into ranked, human-approvable proposals. Proposals are
//! regenerated deterministically from audit data on every scan: an applied
//! proposal disappears on its own because the resulting grant makes its
//! pattern satisfiable, and a dismissed one is suppressed by id for the
//! rest of the session.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use parking_lot::RwLock;
use tracing::{debug, info};

use super::types::{
    recommendation_id, Confidence, Evidence, Recommendation, RecommendationAction,
    RecommendationKind,
};
use crate::audit::{AuditEntry, AuditFilter, AuditRecorder};
use crate::error::{Error, Result};
use crate::permission::PermissionManager;

/// How many recent audit entries one scan examines.
pub const DEFAULT_SCAN_WINDOW: usize = 500;

/// Minimum denials of one capability before proposing an individual grant.
const USER_DENIAL_THRESHOLD: usize = 3;

/// Distinct denied capabilities before proposing a role assignment.
const ROLE_SUGGESTION_THRESHOLD: usize = 5;

/// Mines the audit log for denial patterns and manages proposal lifecycle.
pub struct RecommendationEngine {
    active: RwLock<BTreeMap<String, Recommendation>>,
    dismissed: RwLock<HashSet<String>>,
    scan_window: usize,
}

impl RecommendationEngine {
    /// Create an engine with the default scan window.
    pub fn new() -> Self {
        Self::with_scan_window(DEFAULT_SCAN_WINDOW)
    }

    /// Create an engine examining at most `scan_window` recent entries.
    pub fn with_scan_window(scan_window: usize) -> Self {
        Self {
            active: RwLock::new(BTreeMap::new()),
            dismissed: RwLock::new(HashSet::new()),
            scan_window,
        }
    }

    /// Scan the audit trail and replace the active proposal set.
    ///
    /// All three detection rules run independently; a single scan may
    /// produce proposals from any combination of them. Previously dismissed
    /// ids never reappear.
    pub async fn scan(
        &self,
        recorder: &AuditRecorder,
        permissions: &PermissionManager,
    ) -> Result<Vec<Recommendation>> {
        let mut entries = recorder
            .query(&AuditFilter::default().limit(self.scan_window))
            .await?;
        entries.reverse(); // chronological, so evidence reads oldest-first

        let denials: Vec<&AuditEntry> = entries
            .iter()
            .filter(|e| e.is_denial() && e.permission.required_capability.is_some())
            .collect();

        let mut found = Vec::new();
        found.extend(detect_repeated_denials(&denials, permissions).await?);
        found.extend(detect_role_gaps(&denials, permissions).await?);
        found.extend(detect_role_candidates(&denials, permissions).await?);

        let dismissed = self.dismissed.read();
        let mut active = self.active.write();
        active.clear();
        for rec in found {
            if dismissed.contains(&rec.id) {
                debug!(id = %rec.id, "suppressing dismissed recommendation");
                continue;
            }
            active.insert(rec.id.clone(), rec);
        }
        info!(count = active.len(), "recommendation scan complete");
        Ok(sorted(active.values().cloned().collect()))
    }

    /// The active proposals, highest priority first.
    pub fn list(&self) -> Vec<Recommendation> {
        sorted(self.active.read().values().cloned().collect())
    }

    /// Look up one active proposal.
    pub fn get(&self, id: &str) -> Option<Recommendation> {
        self.active.read().get(id).cloned()
    }

    /// Apply a proposal: perform its permission mutation and retire it.
    ///
    /// On error (unknown id, a target role that no longer exists, or a
    /// proposal that is not auto-executable) the proposal stays active.
    pub async fn apply(
        &self,
        id: &str,
        permissions: &PermissionManager,
    ) -> Result<Recommendation> {
        let rec = self
            .get(id)
            .ok_or_else(|| Error::Recommendation(format!("unknown recommendation: {}", id)))?;

        match rec.kind {
            RecommendationKind::GrantUserCapability => {
                let capability = rec.action.capability.as_deref().ok_or_else(|| {
                    Error::Recommendation("grant proposal without capability".to_string())
                })?;
                permissions
                    .grant_capability(&rec.action.target, capability)
                    .await?;
            }
            RecommendationKind::AssignUserRole => {
                let role = rec.action.role.as_deref().ok_or_else(|| {
                    Error::Recommendation("role proposal without role".to_string())
                })?;
                permissions.assign_role(&rec.action.target, role).await?;
            }
            RecommendationKind::AddRoleCapability => {
                return Err(Error::Recommendation(
                    "role definitions are deployment configuration; update the role config and restart"
                        .to_string(),
                ));
            }
        }

        self.active.write().remove(id);
        info!(id, kind = ?rec.kind, target = %rec.action.target, "recommendation applied");
        Ok(rec)
    }

    /// Dismiss a proposal without mutation. The id will not be regenerated
    /// by later scans within this session.
    pub fn dismiss(&self, id: &str) -> Result<()> {
        if self.active.write().remove(id).is_none() {
            return Err(Error::Recommendation(format!(
                "unknown recommendation: {}",
                id
            )));
        }
        self.dismissed.write().insert(id.to_string());
        info!(id, "recommendation dismissed");
        Ok(())
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted(mut recs: Vec<Recommendation>) -> Vec<Recommendation> {
    recs.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
    recs
}

fn priority_from(count: usize) -> u8 {
    count.clamp(1, 10) as u8
}

fn evidence(entries: &[&AuditEntry]) -> Vec<Evidence> {
    entries
        .iter()
        .map(|e| Evidence {
            entry_id: e.id.clone(),
            timestamp_ms: e.timestamp_ms,
        })
        .collect()
}

/// Rule 1: a (user, capability) pair denied repeatedly wants an individual
/// grant. Pairs the user can already satisfy are skipped, so an applied
/// grant stops regenerating its own proposal even while the historical
/// denials remain inside the scan window.
async fn detect_repeated_denials(
    denials: &[&AuditEntry],
    permissions: &PermissionManager,
) -> Result<Vec<Recommendation>> {
    let registry = permissions.registry();

    let mut by_pair: BTreeMap<(String, String), Vec<&AuditEntry>> = BTreeMap::new();
    for entry in denials {
        if let Some(cap) = &entry.permission.required_capability {
            by_pair
                .entry((entry.user_id.clone(), cap.clone()))
                .or_default()
                .push(entry);
        }
    }

    let mut recs = Vec::new();
    for ((user, cap), entries) in by_pair {
        if entries.len() < USER_DENIAL_THRESHOLD {
            continue;
        }
        let record = permissions.record(&user).await?;
        if record.effective_capabilities(registry).contains(&cap) {
            continue;
        }

        let confidence = if entries.len() >= 5 {
            Confidence::High
        } else {
            Confidence::Medium
        };
        recs.push(Recommendation {
            id: recommendation_id(
                RecommendationKind::GrantUserCapability,
                &format!("{}/{}", user, cap),
            ),
            kind: RecommendationKind::GrantUserCapability,
            confidence,
            priority: priority_from(entries.len()),
            evidence: evidence(&entries),
            action: RecommendationAction {
                target: user,
                capability: Some(cap),
                role: None,
            },
            auto_executable: true,
        });
    }
    Ok(recs)
}

/// Rule 2: most members of a role denied the same capability suggests the
/// role definition is missing it.
async fn detect_role_gaps(
    denials: &[&AuditEntry],
    permissions: &PermissionManager,
) -> Result<Vec<Recommendation>> {
    let users = permissions.list_users().await?;
    let registry = permissions.registry();

    // capability -> users denied it (with their denial entries)
    let mut denied_users: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for entry in denials {
        if let Some(cap) = &entry.permission.required_capability {
            denied_users
                .entry(cap.as_str())
                .or_default()
                .insert(entry.user_id.as_str());
        }
    }

    let mut recs = Vec::new();
    for role in registry.list() {
        let members: Vec<&str> = users
            .iter()
            .filter(|u| u.has_role(&role.name))
            .map(|u| u.user_id.as_str())
            .collect();
        if members.is_empty() {
            continue;
        }

        for (cap, denied) in &denied_users {
            if role.has_capability(cap) {
                continue;
            }
            let denied_members: Vec<&str> = members
                .iter()
                .copied()
                .filter(|m| denied.contains(m))
                .collect();
            let ratio = denied_members.len() as f64 / members.len() as f64;
            if ratio < 0.8 {
                continue;
            }

            let supporting: Vec<&AuditEntry> = denials
                .iter()
                .copied()
                .filter(|e| {
                    e.permission.required_capability.as_deref() == Some(*cap)
                        && denied_members.contains(&e.user_id.as_str())
                })
                .collect();

            recs.push(Recommendation {
                id: recommendation_id(
                    RecommendationKind::AddRoleCapability,
                    &format!("{}/{}", role.name, cap),
                ),
                kind: RecommendationKind::AddRoleCapability,
                confidence: if ratio >= 0.9 {
                    Confidence::High
                } else {
                    Confidence::Medium
                },
                priority: priority_from((ratio * 10.0).round() as usize),
                evidence: evidence(&supporting),
                action: RecommendationAction {
                    target: role.name.clone(),
                    capability: Some((*cap).to_string()),
                    role: None,
                },
                auto_executable: false,
            });
        }
    }
    Ok(recs)
}

/// Rule 3: a user denied many distinct capabilities likely needs a role;
/// pick the existing role whose capability set overlaps their denials most.
async fn detect_role_candidates(
    denials: &[&AuditEntry],
    permissions: &PermissionManager,
) -> Result<Vec<Recommendation>> {
    let registry = permissions.registry();

    let mut by_user: BTreeMap<&str, Vec<&AuditEntry>> = BTreeMap::new();
    for entry in denials {
        by_user.entry(entry.user_id.as_str()).or_default().push(entry);
    }

    let mut recs = Vec::new();
    for (user, entries) in by_user {
        let denied_caps: BTreeSet<&str> = entries
            .iter()
            .filter_map(|e| e.permission.required_capability.as_deref())
            .collect();
        if denied_caps.len() < ROLE_SUGGESTION_THRESHOLD {
            continue;
        }

        let held = permissions.roles_of(user).await?;
        let best = registry
            .list()
            .into_iter()
            .filter(|role| !held.iter().any(|h| h == &role.name))
            .map(|role| {
                let overlap = denied_caps
                    .iter()
                    .filter(|c| role.has_capability(c))
                    .count();
                (role, overlap)
            })
            .filter(|(_, overlap)| *overlap > 0)
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.name.cmp(&a.0.name)));

        let Some((role, overlap)) = best else {
            continue;
        };
        let overlap_pct = overlap as f64 / denied_caps.len() as f64;
        let confidence = if overlap_pct >= 0.8 {
            Confidence::High
        } else if overlap_pct >= 0.6 {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        recs.push(Recommendation {
            id: recommendation_id(
                RecommendationKind::AssignUserRole,
                &format!("{}/{}", user, role.name),
            ),
            kind: RecommendationKind::AssignUserRole,
            confidence,
            priority: priority_from(denied_caps.len()),
            evidence: evidence(&entries),
            action: RecommendationAction {
                target: user.to_string(),
                capability: None,
                role: Some(role.name.clone()),
            },
            auto_executable: true,
        });
    }
    Ok(recs)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::action::Action;
    use crate::audit::ActionOutcome;
    use crate::context::UserContext;
    use crate::permission::{GrantSource, PermissionDecision};
    use crate::role::RoleRegistry;

    fn denial(capability: &str) -> PermissionDecision {
        PermissionDecision {
            allowed: false,
            required_capability: Some(capability.into()),
            granted_by: GrantSource::None,
            role_name: None,
            reason: Some(format!("Missing required capability: {}", capability)),
        }
    }

    async fn deny(recorder: &AuditRecorder, user: &str, capability: &str) {
        recorder
            .record(
                &Action::bare(capability),
                &UserContext::new(user),
                denial(capability),
                ActionOutcome::failed("Permission denied"),
            )
            .await
            .unwrap();
    }

    fn fixtures() -> (AuditRecorder, PermissionManager) {
        let registry = Arc::new(
            RoleRegistry::builder()
                .role("analyst", ["file.read", "api.call", "browser.navigate"])
                .role(
                    "power-user",
                    ["file.read", "file.write", "file.delete", "api.call", "browser.navigate"],
                )
                .build(),
        );
        (AuditRecorder::new(), PermissionManager::new(registry))
    }

    #[tokio::test]
    async fn test_three_denials_produce_medium_grant_recommendation() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        for _ in 0..3 {
            deny(&recorder, "u2", "file.delete").await;
        }

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        assert_eq!(recs.len(), 1);

        let rec = &recs[0];
        assert_eq!(rec.kind, RecommendationKind::GrantUserCapability);
        assert_eq!(rec.confidence, Confidence::Medium);
        assert_eq!(rec.action.target, "u2");
        assert_eq!(rec.action.capability.as_deref(), Some("file.delete"));
        assert_eq!(rec.evidence.len(), 3);
        assert_eq!(rec.priority, 3);
    }

    #[tokio::test]
    async fn test_five_denials_raise_confidence_to_high() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        for _ in 0..5 {
            deny(&recorder, "u2", "file.delete").await;
        }

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        assert_eq!(recs[0].confidence, Confidence::High);
        assert_eq!(recs[0].priority, 5);
    }

    #[tokio::test]
    async fn test_two_denials_are_not_enough() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        deny(&recorder, "u2", "file.delete").await;
        deny(&recorder, "u2", "file.delete").await;

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn test_priority_clamped_to_ten() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        for _ in 0..25 {
            deny(&recorder, "u2", "file.delete").await;
        }

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        assert_eq!(recs[0].priority, 10);
    }

    #[tokio::test]
    async fn test_role_gap_detected_when_most_members_denied() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        for user in ["a", "b", "c", "d", "e"] {
            permissions.assign_role(user, "analyst").await.unwrap();
        }
        // 4 of 5 members denied the same capability the role lacks (80%)
        for user in ["a", "b", "c", "d"] {
            deny(&recorder, user, "file.write").await;
        }

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        let gap = recs
            .iter()
            .find(|r| r.kind == RecommendationKind::AddRoleCapability)
            .unwrap();
        assert_eq!(gap.action.target, "analyst");
        assert_eq!(gap.action.capability.as_deref(), Some("file.write"));
        assert_eq!(gap.confidence, Confidence::Medium); // 80%, below the 90% bar
        assert!(!gap.auto_executable);
        assert_eq!(gap.evidence.len(), 4);
    }

    #[tokio::test]
    async fn test_role_gap_high_confidence_at_full_coverage() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        for user in ["a", "b"] {
            permissions.assign_role(user, "analyst").await.unwrap();
            deny(&recorder, user, "file.write").await;
        }

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        let gap = recs
            .iter()
            .find(|r| r.kind == RecommendationKind::AddRoleCapability)
            .unwrap();
        assert_eq!(gap.confidence, Confidence::High);
    }

    #[tokio::test]
    async fn test_multi_capability_user_gets_role_suggestion() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        // 5 distinct denied capabilities, all covered by power-user (100%)
        for cap in ["file.read", "file.write", "file.delete", "api.call", "browser.navigate"] {
            deny(&recorder, "u3", cap).await;
        }

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        let role_rec = recs
            .iter()
            .find(|r| r.kind == RecommendationKind::AssignUserRole)
            .unwrap();
        assert_eq!(role_rec.action.target, "u3");
        assert_eq!(role_rec.action.role.as_deref(), Some("power-user"));
        assert_eq!(role_rec.confidence, Confidence::High);
        assert_eq!(role_rec.evidence.len(), 5);
    }

    #[tokio::test]
    async fn test_role_suggestion_confidence_scales_with_overlap() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        // 5 distinct capabilities, only 3 covered by power-user (60%)
        for cap in ["file.write", "file.delete", "api.call", "net.scan", "db.drop"] {
            deny(&recorder, "u3", cap).await;
        }

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        let role_rec = recs
            .iter()
            .find(|r| r.kind == RecommendationKind::AssignUserRole)
            .unwrap();
        assert_eq!(role_rec.confidence, Confidence::Medium);
    }

    #[tokio::test]
    async fn test_dismissed_id_does_not_reappear() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        for _ in 0..3 {
            deny(&recorder, "u2", "file.delete").await;
        }

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        let id = recs[0].id.clone();
        engine.dismiss(&id).unwrap();

        // Same audit data, fresh scan: the id stays suppressed.
        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        assert!(recs.iter().all(|r| r.id != id));
    }

    #[tokio::test]
    async fn test_apply_grant_mutates_store_and_retires_proposal() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        for _ in 0..3 {
            deny(&recorder, "u2", "file.delete").await;
        }

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        let id = recs[0].id.clone();

        engine.apply(&id, &permissions).await.unwrap();

        assert!(permissions
            .capabilities_of("u2")
            .await
            .unwrap()
            .contains("file.delete"));
        assert!(engine.get(&id).is_none());
    }

    #[tokio::test]
    async fn test_apply_role_gap_is_rejected_and_stays_active() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        for user in ["a", "b"] {
            permissions.assign_role(user, "analyst").await.unwrap();
            deny(&recorder, user, "file.write").await;
        }

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        let gap_id = recs
            .iter()
            .find(|r| r.kind == RecommendationKind::AddRoleCapability)
            .unwrap()
            .id
            .clone();

        let err = engine.apply(&gap_id, &permissions).await.unwrap_err();
        assert!(err.is_recommendation());
        assert!(engine.get(&gap_id).is_some());
    }

    #[tokio::test]
    async fn test_apply_unknown_id_errors() {
        let (_, permissions) = fixtures();
        let engine = RecommendationEngine::new();
        assert!(engine.apply("nope", &permissions).await.is_err());
        assert!(engine.dismiss("nope").is_err());
    }

    #[tokio::test]
    async fn test_applied_grant_not_regenerated_while_denials_remain_in_window() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        for _ in 0..3 {
            deny(&recorder, "u2", "file.delete").await;
        }
        let id = engine.scan(&recorder, &permissions).await.unwrap()[0].id.clone();
        engine.apply(&id, &permissions).await.unwrap();

        // The three denials are still inside the default scan window; the
        // granted capability keeps the proposal from coming back.
        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn test_role_derived_capability_suppresses_grant_proposal() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::new();

        for _ in 0..3 {
            deny(&recorder, "u2", "file.delete").await;
        }
        // power-user carries file.delete, so the pair is now satisfiable.
        permissions.assign_role("u2", "power-user").await.unwrap();

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        assert!(recs
            .iter()
            .all(|r| r.kind != RecommendationKind::GrantUserCapability));
    }

    #[tokio::test]
    async fn test_applied_grant_ends_regeneration_once_denials_stop() {
        let (recorder, permissions) = fixtures();
        let engine = RecommendationEngine::with_scan_window(3);

        for _ in 0..3 {
            deny(&recorder, "u2", "file.delete").await;
        }
        let id = engine.scan(&recorder, &permissions).await.unwrap()[0].id.clone();
        engine.apply(&id, &permissions).await.unwrap();

        // With the grant in place, later calls succeed; once the denials
        // age out of the scan window the proposal is gone for good.
        for _ in 0..3 {
            recorder
                .record(
                    &Action::bare("file.delete"),
                    &UserContext::new("u2"),
                    PermissionDecision {
                        allowed: true,
                        required_capability: Some("file.delete".into()),
                        granted_by: GrantSource::Individual,
                        role_name: None,
                        reason: None,
                    },
                    ActionOutcome::ok(),
                )
                .await
                .unwrap();
        }

        let recs = engine.scan(&recorder, &permissions).await.unwrap();
        assert!(recs.is_empty());
    }
}
