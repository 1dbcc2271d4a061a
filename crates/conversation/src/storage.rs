//! Durable key-value slots.
//!
//! The file-backed store keeps every slot in memory and writes the whole map
//! through to a single JSON file on each change.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no config directory available")]
    NoConfigDir,
}

/// Named string slots that survive restarts.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile store, used in tests and when no config directory exists.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.slots.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.slots.remove(key);
        Ok(())
    }
}

/// JSON file of `slot -> text`, mirrored in memory.
pub struct FileStore {
    path: PathBuf,
    slots: BTreeMap<String, String>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`. A corrupt file is
    /// treated as empty and overwritten on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let slots = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable store {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, slots }
    }

    /// Store under the app's config directory.
    pub fn open_default() -> Result<Self, StorageError> {
        let dir = shared::settings::config_dir().ok_or(StorageError::NoConfigDir)?;
        Ok(Self::open(dir.join("storage.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.slots)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.slots.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.slots.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let mut store = FileStore::open(&path);
        store.set("chatHistory", "[1,2,3]".into()).unwrap();
        store.set("other", "x".into()).unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("chatHistory").as_deref(), Some("[1,2,3]"));
        assert_eq!(reopened.get("other").as_deref(), Some("x"));
    }

    #[test]
    fn test_file_store_remove() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let mut store = FileStore::open(&path);
        store.set("chatHistory", "[]".into()).unwrap();
        store.remove("chatHistory").unwrap();
        // Removing a missing slot is fine
        store.remove("chatHistory").unwrap();

        assert!(FileStore::open(&path).get("chatHistory").is_none());
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        let mut store = FileStore::open(&path);
        assert!(store.get("chatHistory").is_none());
        store.set("chatHistory", "ok".into()).unwrap();
        assert_eq!(FileStore::open(&path).get("chatHistory").as_deref(), Some("ok"));
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        store.set("a", "1".into()).unwrap();
        assert!(store.contains("a"));
        store.remove("a").unwrap();
        assert!(store.get("a").is_none());
    }
}
