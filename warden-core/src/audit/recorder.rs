//! The audit recorder.
//!
//! One recorder instance serves the whole pipeline. It assigns ids and
//! monotonic timestamps, keeps a bounded in-memory window of recent entries,
//! publishes every entry to the live bus, and appends to the durable log.
//! A failed durable append is a hard error surfaced to the caller; the
//! in-memory window and the bus publication still happen so live observers
//! keep working under storage degradation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::bus::AuditBus;
use super::entry::{ActionOutcome, AuditEntry, AuditFilter};
use super::log::{AuditLog, MemoryAuditLog};
use crate::action::Action;
use crate::context::UserContext;
use crate::error::{Error, Result};
use crate::permission::PermissionDecision;

/// How many recent entries are retained in memory regardless of the durable
/// log's health.
pub const RECENT_RETENTION: usize = 100;

/// Records every governed call and publishes entries to live subscribers.
pub struct AuditRecorder {
    log: Box<dyn AuditLog>,
    bus: AuditBus,
    recent: RwLock<VecDeque<Arc<AuditEntry>>>,
    clock: AtomicI64,
}

impl AuditRecorder {
    /// Create a recorder backed by an in-memory log.
    pub fn new() -> Self {
        Self::with_log(MemoryAuditLog::new())
    }

    /// Create a recorder with a custom durable log.
    pub fn with_log(log: impl AuditLog + 'static) -> Self {
        Self {
            log: Box::new(log),
            bus: AuditBus::default(),
            recent: RwLock::new(VecDeque::with_capacity(RECENT_RETENTION)),
            clock: AtomicI64::new(0),
        }
    }

    /// The live-update bus for this recorder.
    pub fn bus(&self) -> &AuditBus {
        &self.bus
    }

    /// Next timestamp: wall-clock milliseconds, clamped so the sequence
    /// never decreases even if the system clock steps backwards.
    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self.clock.fetch_max(now, Ordering::SeqCst);
        prev.max(now)
    }

    /// Record one governed call.
    ///
    /// Called exactly once per call, allowed or denied. Returns the written
    /// entry, or [`Error::AuditWrite`] if the durable append failed - in
    /// which case the entry was still retained in memory and published to
    /// subscribers, but the caller must not treat the call as audited.
    pub async fn record(
        &self,
        action: &Action,
        ctx: &UserContext,
        permission: PermissionDecision,
        result: ActionOutcome,
    ) -> Result<AuditEntry> {
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            timestamp_ms: self.next_timestamp(),
            user_id: ctx.user_id.clone(),
            action: action.clone(),
            permission,
            result,
        };

        let shared = Arc::new(entry.clone());
        {
            let mut recent = self.recent.write();
            if recent.len() == RECENT_RETENTION {
                recent.pop_front();
            }
            recent.push_back(Arc::clone(&shared));
        }
        self.bus.publish(shared);

        if let Err(e) = self.log.append(&entry).await {
            warn!(entry_id = %entry.id, error = %e, "audit append failed");
            return Err(Error::AuditWrite(e.to_string()));
        }
        Ok(entry)
    }

    /// Query the durable log, most recent first.
    pub async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        Ok(self.log.query(filter).await?)
    }

    /// The in-memory window of recent entries, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<Arc<AuditEntry>> {
        self.recent
            .read()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}

impl Default for AuditRecorder {
    fn default() -> Self {
        Self::new()
    }
}
