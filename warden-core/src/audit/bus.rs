//! Live publication of audit entries.
//!
//! The bus decouples the governed call from its observers: publishing never
//! blocks, and a slow or disconnected subscriber can only lag or miss
//! events, never stall a request. Subscribers drop their receiver to
//! unsubscribe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::entry::AuditEntry;

/// Default broadcast channel capacity.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Severity of an audit alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// A permission denial.
    Warning,
    /// An allowed action whose execution failed.
    Critical,
}

/// A derived alert for denials and execution failures.
///
/// Alerts are a filtered view over the entry stream, not a separate source
/// of truth.
#[derive(Debug, Clone, Serialize)]
pub struct AuditAlert {
    /// How severe the alert is.
    pub severity: AlertSeverity,
    /// The entry that triggered it.
    pub entry: Arc<AuditEntry>,
}

impl AuditAlert {
    /// Derive an alert from an entry, or `None` for uneventful entries.
    pub fn from_entry(entry: &Arc<AuditEntry>) -> Option<Self> {
        let severity = if entry.is_denial() {
            AlertSeverity::Warning
        } else if entry.is_execution_failure() {
            AlertSeverity::Critical
        } else {
            return None;
        };
        Some(Self {
            severity,
            entry: Arc::clone(entry),
        })
    }
}

/// Publish/subscribe channel for audit entries and derived alerts.
pub struct AuditBus {
    updates: broadcast::Sender<Arc<AuditEntry>>,
    alerts: broadcast::Sender<AuditAlert>,
    published: AtomicU64,
}

impl AuditBus {
    /// Create a bus with the given per-subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity);
        let (alerts, _) = broadcast::channel(capacity);
        Self {
            updates,
            alerts,
            published: AtomicU64::new(0),
        }
    }

    /// Subscribe to every new audit entry.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AuditEntry>> {
        self.updates.subscribe()
    }

    /// Subscribe to denial and failure alerts only.
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<AuditAlert> {
        self.alerts.subscribe()
    }

    /// Publish an entry to all subscribers. Never blocks; an entry with no
    /// subscribers is simply dropped.
    pub fn publish(&self, entry: Arc<AuditEntry>) {
        self.published.fetch_add(1, Ordering::Relaxed);
        debug!(entry_id = %entry.id, user_id = %entry.user_id, "publishing audit entry");

        if let Some(alert) = AuditAlert::from_entry(&entry) {
            let _ = self.alerts.send(alert);
        }
        let _ = self.updates.send(entry);
    }

    /// Total entries published since the bus was created.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Number of live entry subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.updates.receiver_count()
    }
}

impl Default for AuditBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::audit::entry::ActionOutcome;
    use crate::permission::{GrantSource, PermissionDecision};

    fn entry(allowed: bool, success: bool) -> Arc<AuditEntry> {
        Arc::new(AuditEntry {
            id: "e1".into(),
            timestamp_ms: 0,
            user_id: "u1".into(),
            action: Action::bare("click"),
            permission: PermissionDecision {
                allowed,
                required_capability: Some("input.pointer".into()),
                granted_by: if allowed {
                    GrantSource::Individual
                } else {
                    GrantSource::None
                },
                role_name: None,
                reason: None,
            },
            result: ActionOutcome {
                success,
                error: None,
            },
        })
    }

    #[tokio::test]
    async fn test_subscribers_receive_entries() {
        let bus = AuditBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(entry(true, true));

        assert_eq!(rx1.recv().await.unwrap().id, "e1");
        assert_eq!(rx2.recv().await.unwrap().id, "e1");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_fail() {
        let bus = AuditBus::default();
        bus.publish(entry(true, true));
        assert_eq!(bus.published(), 1);
    }

    #[tokio::test]
    async fn test_denial_alert_is_warning() {
        let bus = AuditBus::default();
        let mut alerts = bus.subscribe_alerts();

        bus.publish(entry(false, false));

        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.severity, AlertSeverity::Warning);
    }

    #[tokio::test]
    async fn test_execution_failure_alert_is_critical() {
        let bus = AuditBus::default();
        let mut alerts = bus.subscribe_alerts();

        bus.publish(entry(true, false));

        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.severity, AlertSeverity::Critical);
    }

    #[tokio::test]
    async fn test_successful_entry_produces_no_alert() {
        let bus = AuditBus::default();
        let mut alerts = bus.subscribe_alerts();

        bus.publish(entry(true, true));
        bus.publish(entry(false, false));

        // The first alert seen is from the denial, not the success.
        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.severity, AlertSeverity::Warning);
    }

    #[tokio::test]
    async fn test_dropped_receiver_unsubscribes() {
        let bus = AuditBus::default();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
