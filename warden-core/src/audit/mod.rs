//! Append-only audit trail with live subscription.
//!
//! Every governed call produces exactly one [`AuditEntry`], allowed or
//! denied. Entries flow to three places: a durable append-only
//! [`AuditLog`], a bounded in-memory window of recent entries, and the
//! [`AuditBus`] for live subscribers. The durable append is the source of
//! truth - if it fails, the call is reported as unaudited via
//! [`Error::AuditWrite`](crate::Error::AuditWrite) - while the window and
//! bus keep dashboards alive even when storage is degraded.

mod bus;
mod entry;
mod log;
mod recorder;

pub use bus::{AlertSeverity, AuditAlert, AuditBus, DEFAULT_BUS_CAPACITY};
pub use entry::{ActionOutcome, AuditEntry, AuditFilter};
pub use log::{AuditLog, AuditLogError, FileAuditLog, MemoryAuditLog};
pub use recorder::{AuditRecorder, RECENT_RETENTION};
