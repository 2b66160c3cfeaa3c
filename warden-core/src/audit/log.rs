//! Audit log storage trait and implementations.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use super::entry::{AuditEntry, AuditFilter};

/// Errors that can occur in audit log operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditLogError {
    /// Failed to read entries from storage.
    #[error("Failed to read audit log: {0}")]
    Read(String),

    /// Failed to write an entry to storage.
    #[error("Failed to write audit log: {0}")]
    Write(String),

    /// IO error during storage operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for durable, ordered, append-only audit storage.
///
/// Entries are immutable once appended. Implementations must preserve
/// append order; `query` returns entries most-recent-first.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append one entry.
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditLogError>;

    /// Query entries, most recent first.
    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditLogError>;
}

fn apply_filter(entries: &[AuditEntry], filter: &AuditFilter) -> Vec<AuditEntry> {
    let matched = entries.iter().rev().filter(|e| filter.matches(e));
    match filter.limit {
        Some(limit) => matched.take(limit).cloned().collect(),
        None => matched.cloned().collect(),
    }
}

/// In-memory audit log.
///
/// Entries are lost when the process exits. This is the default log used by
/// the recorder and is suitable for tests and ephemeral deployments.
pub struct MemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditLogError> {
        self.entries
            .write()
            .expect("RwLock poisoned")
            .push(entry.clone());
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditLogError> {
        Ok(apply_filter(
            &self.entries.read().expect("RwLock poisoned"),
            filter,
        ))
    }
}

/// File-backed audit log: one JSON object per line, strictly append-only.
///
/// The file is never rewritten in place. Existing entries are loaded into a
/// query mirror when the log is opened; appends go to both the file and the
/// mirror, and the file write is flushed before the append is reported
/// successful.
pub struct FileAuditLog {
    file: Mutex<File>,
    mirror: RwLock<Vec<AuditEntry>>,
    path: PathBuf,
}

impl FileAuditLog {
    /// Open (or create) a log at the given path.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuditLogError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut entries = Vec::new();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            for line in contents.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                entries.push(serde_json::from_str(line)?);
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            file: Mutex::new(file),
            mirror: RwLock::new(entries),
            path,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl AuditLog for FileAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditLogError> {
        let line = serde_json::to_string(entry)?;
        {
            let mut file = self.file.lock().expect("Mutex poisoned");
            writeln!(file, "{}", line)?;
            file.flush()?;
        }
        self.mirror
            .write()
            .expect("RwLock poisoned")
            .push(entry.clone());
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditLogError> {
        Ok(apply_filter(
            &self.mirror.read().expect("RwLock poisoned"),
            filter,
        ))
    }
}
