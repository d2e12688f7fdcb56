//! Key-value persistence for JSON documents and binary blobs
//!
//! The library keeps recent videos and the pending import here. Values are
//! stored as `serde_json::Value`; [`KeyValueStoreExt`] adds typed access.
//! Blobs (media bytes) live in a separate namespace under the same keys.

use crate::error::{ShortsError, ShortsResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Durable string-keyed storage of JSON values and byte blobs
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> ShortsResult<Option<serde_json::Value>>;

    fn set_raw(&self, key: &str, value: serde_json::Value) -> ShortsResult<()>;

    /// Remove `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> ShortsResult<()>;

    fn get_blob(&self, key: &str) -> ShortsResult<Option<Vec<u8>>>;

    fn set_blob(&self, key: &str, data: &[u8]) -> ShortsResult<()>;

    /// Remove the blob under `key`. Missing blobs are not an error.
    fn remove_blob(&self, key: &str) -> ShortsResult<()>;

    /// Remove every value and blob
    fn clear(&self) -> ShortsResult<()>;
}

/// Typed helpers over [`KeyValueStore`]
pub trait KeyValueStoreExt {
    /// Read and decode `key`. A value that fails to decode is an error.
    fn get<T: DeserializeOwned>(&self, key: &str) -> ShortsResult<Option<T>>;

    fn set<T: Serialize>(&self, key: &str, value: &T) -> ShortsResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {
    fn get<T: DeserializeOwned>(&self, key: &str) -> ShortsResult<Option<T>> {
        match self.get_raw(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> ShortsResult<()> {
        self.set_raw(key, serde_json::to_value(value)?)
    }
}

/// In-process store, used in tests and when no data directory is available
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, serde_json::Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn blobs(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> ShortsResult<Option<serde_json::Value>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: serde_json::Value) -> ShortsResult<()> {
        self.entries().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> ShortsResult<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn get_blob(&self, key: &str) -> ShortsResult<Option<Vec<u8>>> {
        Ok(self.blobs().get(key).cloned())
    }

    fn set_blob(&self, key: &str, data: &[u8]) -> ShortsResult<()> {
        self.blobs().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn remove_blob(&self, key: &str) -> ShortsResult<()> {
        self.blobs().remove(key);
        Ok(())
    }

    fn clear(&self) -> ShortsResult<()> {
        self.entries().clear();
        self.blobs().clear();
        Ok(())
    }
}

/// Store keeping one pretty-printed JSON file per key in a directory,
/// with blobs as `<key>.bin` beside them
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> ShortsResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Platform data directory for the store
    pub fn default_dir() -> ShortsResult<PathBuf> {
        directories::ProjectDirs::from("app", "shorts", "Shorts")
            .map(|dirs| dirs.data_dir().join("storage"))
            .ok_or_else(|| ShortsError::storage("Could not determine data directory"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> ShortsResult<PathBuf> {
        self.path_for(key, "json")
    }

    fn blob_path(&self, key: &str) -> ShortsResult<PathBuf> {
        self.path_for(key, "bin")
    }

    fn path_for(&self, key: &str, extension: &str) -> ShortsResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ShortsError::storage(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.{}", key, extension)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_raw(&self, key: &str) -> ShortsResult<Option<serde_json::Value>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn set_raw(&self, key: &str, value: serde_json::Value) -> ShortsResult<()> {
        let path = self.key_path(key)?;
        let json = serde_json::to_string_pretty(&value)?;

        write_replacing(&path, json.as_bytes())?;

        debug!("Stored key {} at {:?}", key, path);
        Ok(())
    }

    fn remove(&self, key: &str) -> ShortsResult<()> {
        remove_if_present(&self.key_path(key)?)
    }

    fn get_blob(&self, key: &str) -> ShortsResult<Option<Vec<u8>>> {
        let path = self.blob_path(key)?;
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_blob(&self, key: &str, data: &[u8]) -> ShortsResult<()> {
        let path = self.blob_path(key)?;
        write_replacing(&path, data)?;
        debug!("Stored {} byte blob {} at {:?}", data.len(), key, path);
        Ok(())
    }

    fn remove_blob(&self, key: &str) -> ShortsResult<()> {
        remove_if_present(&self.blob_path(key)?)
    }

    fn clear(&self) -> ShortsResult<()> {
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if matches!(ext, Some("json") | Some("bin")) {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("Failed to remove {:?}: {}", path, e);
                }
            }
        }
        Ok(())
    }
}

/// Write to a temporary file then rename, so a crash never leaves a half-written value
fn write_replacing(path: &Path, data: &[u8]) -> ShortsResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn remove_if_present(path: &Path) -> ShortsResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    fn sample() -> Sample {
        Sample {
            name: "clip".to_string(),
            count: 3,
        }
    }

    #[test]
    fn test_memory_store_typed_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get::<Sample>("sample").unwrap(), None);

        store.set("sample", &sample()).unwrap();
        assert_eq!(store.get::<Sample>("sample").unwrap(), Some(sample()));

        store.remove("sample").unwrap();
        store.remove("sample").unwrap();
        assert_eq!(store.get::<Sample>("sample").unwrap(), None);
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let store = MemoryStore::new();
        store.set("sample", &"just a string").unwrap();
        assert!(store.get::<Sample>("sample").is_err());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = JsonFileStore::open(dir.path()).unwrap();
        store.set("sample", &sample()).unwrap();

        let reopened = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get::<Sample>("sample").unwrap(), Some(sample()));
        assert!(dir.path().join("sample.json").exists());
    }

    #[test]
    fn test_file_store_clear_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        store.set("a", &1).unwrap();
        store.set("b", &2).unwrap();
        store.remove("missing").unwrap();

        store.clear().unwrap();
        assert_eq!(store.get::<i32>("a").unwrap(), None);
        assert_eq!(store.get::<i32>("b").unwrap(), None);
    }

    #[test]
    fn test_blobs_stored_beside_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        store.set("clip", &"meta").unwrap();
        store.set_blob("clip", &[0, 1, 2, 255]).unwrap();
        assert!(dir.path().join("clip.bin").exists());

        let reopened = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get_blob("clip").unwrap(), Some(vec![0, 1, 2, 255]));
        assert_eq!(reopened.get::<String>("clip").unwrap().as_deref(), Some("meta"));

        reopened.remove_blob("clip").unwrap();
        reopened.remove_blob("clip").unwrap();
        assert_eq!(reopened.get_blob("clip").unwrap(), None);
        assert!(reopened.get::<String>("clip").unwrap().is_some());

        reopened.set_blob("other", b"x").unwrap();
        reopened.clear().unwrap();
        assert_eq!(reopened.get_blob("other").unwrap(), None);
    }

    #[test]
    fn test_memory_store_blobs() {
        let store = MemoryStore::new();
        store.set_blob("clip", b"abc").unwrap();
        assert_eq!(store.get_blob("clip").unwrap(), Some(b"abc".to_vec()));
        store.clear().unwrap();
        assert_eq!(store.get_blob("clip").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        assert!(store.set("../escape", &1).is_err());
        assert!(store.get::<i32>("").is_err());
    }

    #[test]
    fn test_file_store_corrupt_value_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        assert!(store.get_raw("broken").is_err());
    }

    #[test]
    fn test_store_usable_as_trait_object() {
        let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        store.set("n", &42u32).unwrap();
        assert_eq!(store.get::<u32>("n").unwrap(), Some(42));
    }
}
