//! Session Store - persistence of the single session record
//!
//! A store holds at most one record, serialized as JSON under
//! [`SESSION_STORAGE_KEY`]. Missing and malformed entries both read back as
//! absent.

use super::{SessionRecord, StoreError, StoreResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Fixed storage key of the session record
pub const SESSION_STORAGE_KEY: &str = "schooldesk.session";

/// Persistence of exactly one session record
pub trait SessionStore: Send + Sync {
    /// Serialize and store the record, replacing any existing one
    fn write(&self, record: &SessionRecord) -> StoreResult<()>;

    /// Read the stored record; `None` if missing or malformed
    fn read(&self) -> Option<SessionRecord>;

    /// Remove the stored record
    fn clear(&self);
}

/// Context-scoped in-memory key-value storage.
///
/// Mirrors browser storage: string values under string keys, with an
/// optional byte quota across all entries.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with a byte quota; writes that would exceed it fail
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Raw stored value under the session key
    pub fn raw(&self) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(SESSION_STORAGE_KEY)
            .cloned()
    }

    /// Overwrite the raw value under the session key without validation
    pub fn put_raw<S: Into<String>>(&self, value: S) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(SESSION_STORAGE_KEY.to_string(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.raw().is_none()
    }
}

impl SessionStore for MemorySessionStore {
    fn write(&self, record: &SessionRecord) -> StoreResult<()> {
        let json = serde_json::to_string(record)?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(key, _)| key.as_str() != SESSION_STORAGE_KEY)
                .map(|(key, value)| key.len() + value.len())
                .sum();
            let needed = others + SESSION_STORAGE_KEY.len() + json.len();
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }

        entries.insert(SESSION_STORAGE_KEY.to_string(), json);
        debug!("Stored session record for {}", record.identity);
        Ok(())
    }

    fn read(&self) -> Option<SessionRecord> {
        let raw = self.raw()?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring malformed session record: {}", e);
                None
            }
        }
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(SESSION_STORAGE_KEY);
    }
}

/// File-backed store: one JSON file named after the session key
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    storage_dir: PathBuf,
}

impl FileSessionStore {
    /// Create a file store rooted at `storage_dir`
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> StoreResult<Self> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        debug!("Session file store at: {}", storage_dir.display());
        Ok(Self { storage_dir })
    }

    pub fn record_path(&self) -> PathBuf {
        self.storage_dir.join(format!("{}.json", SESSION_STORAGE_KEY))
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

impl SessionStore for FileSessionStore {
    fn write(&self, record: &SessionRecord) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(record)?;
        let path = self.record_path();
        let staging = path.with_extension("json.tmp");

        std::fs::write(&staging, json)?;
        std::fs::rename(&staging, &path)?;

        debug!("Saved session record to {}", path.display());
        Ok(())
    }

    fn read(&self) -> Option<SessionRecord> {
        let path = self.record_path();
        if !path.exists() {
            return None;
        }

        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to read session record {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring malformed session record {}: {}", path.display(), e);
                None
            }
        }
    }

    fn clear(&self) {
        let path = self.record_path();
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove session record {}: {}", path.display(), e);
            } else {
                debug!("Deleted session record: {}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use schooldesk_core::Role;
    use std::collections::BTreeMap;

    fn record() -> SessionRecord {
        let mut claims = BTreeMap::new();
        claims.insert("sectionId".to_string(), serde_json::json!("sec-7a"));
        claims.insert("children".to_string(), serde_json::json!(["stu-1", "stu-2"]));

        SessionRecord {
            identity: "par-001".to_string(),
            role: Role::Parent,
            first_name: "Ana".to_string(),
            last_name: "Reyes".to_string(),
            email: Some("ana@home.test".to_string()),
            created_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            expires_at: Utc.timestamp_millis_opt(1_700_014_400_000).unwrap(),
            must_change_password: true,
            logged_in: true,
            claims,
        }
    }

    #[test]
    fn test_memory_round_trip() {
        let store = MemorySessionStore::new();
        assert!(store.read().is_none());

        store.write(&record()).unwrap();
        assert_eq!(store.read(), Some(record()));
    }

    #[test]
    fn test_memory_write_overwrites() {
        let store = MemorySessionStore::new();
        store.write(&record()).unwrap();

        let replacement = SessionRecord {
            identity: "adm-001".to_string(),
            role: Role::Admin,
            ..record()
        };
        store.write(&replacement).unwrap();

        assert_eq!(store.read().unwrap().identity, "adm-001");
    }

    #[test]
    fn test_malformed_entry_reads_as_absent() {
        let store = MemorySessionStore::new();
        store.put_raw("{not json");
        assert!(store.read().is_none());

        store.put_raw(r#"{"identity":"x"}"#);
        assert!(store.read().is_none());
    }

    #[test]
    fn test_clear_is_unconditional() {
        let store = MemorySessionStore::new();
        store.clear();
        store.write(&record()).unwrap();
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_quota_exceeded() {
        let store = MemorySessionStore::with_quota(32);
        let err = store.write(&record()).unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { quota: 32, .. }));
        assert!(store.read().is_none());
    }

    #[test]
    fn test_file_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("ctx")).unwrap();

        store.write(&record()).unwrap();
        assert!(store.record_path().exists());
        assert_eq!(store.read(), Some(record()));

        store.clear();
        assert!(!store.record_path().exists());
        assert!(store.read().is_none());
    }

    #[test]
    fn test_file_malformed_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();
        std::fs::write(store.record_path(), "garbage").unwrap();

        assert!(store.read().is_none());
    }
}
