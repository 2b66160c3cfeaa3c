//! Permission record storage trait and implementations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;

use super::record::UserPermissionRecord;

/// Errors that can occur in permission store operations.
#[derive(Debug, thiserror::Error)]
pub enum PermissionStoreError {
    /// Failed to read records from storage.
    #[error("Failed to read permission records: {0}")]
    Read(String),

    /// Failed to write records to storage.
    #[error("Failed to write permission records: {0}")]
    Write(String),

    /// IO error during storage operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for permission record storage implementations.
///
/// A record is saved and loaded as a whole; last-write-wins on concurrent
/// saves of the same user is acceptable, but a completed `save` must be
/// visible to the very next `load`.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Save (or overwrite) one user's record.
    async fn save(&self, record: UserPermissionRecord) -> Result<(), PermissionStoreError>;

    /// Load one user's record, or `None` if the user has never been seen.
    async fn load(&self, user_id: &str)
        -> Result<Option<UserPermissionRecord>, PermissionStoreError>;

    /// Load every stored record.
    async fn load_all(&self) -> Result<Vec<UserPermissionRecord>, PermissionStoreError>;

    /// Remove all records.
    async fn clear(&self) -> Result<(), PermissionStoreError>;
}

/// In-memory permission store.
///
/// Records are cleared when the process exits. This is the default store
/// used by the pipeline and is suitable for tests and ephemeral deployments.
pub struct MemoryPermissionStore {
    records: RwLock<HashMap<String, UserPermissionRecord>>,
}

impl MemoryPermissionStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryPermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn save(&self, record: UserPermissionRecord) -> Result<(), PermissionStoreError> {
        let mut records = self.records.write().expect("RwLock poisoned");
        records.insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn load(
        &self,
        user_id: &str,
    ) -> Result<Option<UserPermissionRecord>, PermissionStoreError> {
        Ok(self
            .records
            .read()
            .expect("RwLock poisoned")
            .get(user_id)
            .cloned())
    }

    async fn load_all(&self) -> Result<Vec<UserPermissionRecord>, PermissionStoreError> {
        let mut records: Vec<_> = self
            .records
            .read()
            .expect("RwLock poisoned")
            .values()
            .cloned()
            .collect();
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(records)
    }

    async fn clear(&self) -> Result<(), PermissionStoreError> {
        self.records.write().expect("RwLock poisoned").clear();
        Ok(())
    }
}

/// File-based permission store.
///
/// Each user's record is one JSON document under the store directory,
/// overwritten as a whole on save. The directory is created on the first
/// write. The user id itself lives inside the document; the file name is a
/// sanitized rendering of it.
pub struct FilePermissionStore {
    dir: PathBuf,
}

impl FilePermissionStore {
    /// Create a store rooted at the given directory.
    ///
    /// The directory does not need to exist - it is created when the first
    /// record is saved.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(user_id)))
    }
}

/// Render an opaque user id as a filesystem-safe file stem.
fn file_stem(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl PermissionStore for FilePermissionStore {
    async fn save(&self, record: UserPermissionRecord) -> Result<(), PermissionStoreError> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
        }
        let json = serde_json::to_string_pretty(&record)?;
        std::fs::write(self.path_for(&record.user_id), json)?;
        Ok(())
    }

    async fn load(
        &self,
        user_id: &str,
    ) -> Result<Option<UserPermissionRecord>, PermissionStoreError> {
        let path = self.path_for(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let record: UserPermissionRecord = serde_json::from_str(&contents)?;
        // Sanitized file names can collide; the id inside the document is
        // authoritative.
        if record.user_id == user_id {
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    async fn load_all(&self) -> Result<Vec<UserPermissionRecord>, PermissionStoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = std::fs::read_to_string(&path)?;
            records.push(serde_json::from_str(&contents)?);
        }
        records.sort_by(|a: &UserPermissionRecord, b: &UserPermissionRecord| {
            a.user_id.cmp(&b.user_id)
        });
        Ok(records)
    }

    async fn clear(&self) -> Result<(), PermissionStoreError> {
        if !self.dir.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: &str, role: &str) -> UserPermissionRecord {
        let mut r = UserPermissionRecord::new(user_id);
        r.assign_role(role);
        r
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryPermissionStore::new();

        assert!(store.load("u1").await.unwrap().is_none());

        store.save(record("u1", "analyst")).await.unwrap();

        let loaded = store.load("u1").await.unwrap().unwrap();
        assert!(loaded.has_role("analyst"));
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_overwrites_whole_record() {
        let store = MemoryPermissionStore::new();
        store.save(record("u1", "analyst")).await.unwrap();
        store.save(record("u1", "admin")).await.unwrap();

        let loaded = store.load("u1").await.unwrap().unwrap();
        assert!(loaded.has_role("admin"));
        assert!(!loaded.has_role("analyst"));
    }

    #[tokio::test]
    async fn test_memory_store_clear() {
        let store = MemoryPermissionStore::new();
        store.save(record("u1", "analyst")).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_basic() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePermissionStore::new(dir.path().join("perms"));

        assert!(store.load("u1").await.unwrap().is_none());

        store.save(record("u1", "analyst")).await.unwrap();

        // New store instance to verify persistence
        let store2 = FilePermissionStore::new(dir.path().join("perms"));
        let loaded = store2.load("u1").await.unwrap().unwrap();
        assert!(loaded.has_role("analyst"));
    }

    #[tokio::test]
    async fn test_file_store_load_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePermissionStore::new(dir.path());

        store.save(record("b", "analyst")).await.unwrap();
        store.save(record("a", "observer")).await.unwrap();

        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_id, "a");
    }

    #[tokio::test]
    async fn test_file_store_unsafe_user_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePermissionStore::new(dir.path());

        store.save(record("user@example.com/../x", "analyst")).await.unwrap();
        let loaded = store.load("user@example.com/../x").await.unwrap().unwrap();
        assert_eq!(loaded.user_id, "user@example.com/../x");
    }

    #[tokio::test]
    async fn test_file_store_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePermissionStore::new(dir.path());
        store.save(record("u1", "analyst")).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_file_stem_sanitizes() {
        assert_eq!(file_stem("u1"), "u1");
        assert_eq!(file_stem("a/b"), "a_b");
        assert_eq!(file_stem("x@y"), "x_y");
    }
}
