use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::{info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::services::{CompressionQuality, RecordOptions, StorageRef};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type-safe configuration key that associates a key name with its value type
#[derive(Debug, Clone, Copy)]
pub struct ConfigKey<T> {
    name: &'static str,
    _phantom: PhantomData<T>,
}

impl<T> ConfigKey<T> {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    pub fn key_name(&self) -> &'static str {
        self.name
    }
}

// ===== Lifecycle Configuration =====

/// Tunables of the record/upload/playback cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleConfig {
    /// Storage slot every upload overwrites
    pub storage_ref: StorageRef,
    /// Preset used to shrink the clip before upload
    pub compression_quality: CompressionQuality,
    /// Minimum wait after a successful upload before looking for the new asset
    pub refresh_delay_ms: u64,
    /// How many times to look for the uploaded asset before giving up
    pub refresh_attempts: u32,
    /// Pause between those lookups
    pub refresh_backoff_ms: u64,
    /// Options passed to the camera for every clip
    pub record_options: RecordOptions,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            storage_ref: StorageRef::default(),
            compression_quality: CompressionQuality::Low,
            refresh_delay_ms: 2000,
            refresh_attempts: 3,
            refresh_backoff_ms: 1000,
            record_options: RecordOptions::default(),
        }
    }
}

impl LifecycleConfig {
    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn refresh_backoff(&self) -> Duration {
        Duration::from_millis(self.refresh_backoff_ms)
    }
}

impl ConfigKey<LifecycleConfig> {
    pub const LIFECYCLE: Self = Self::new("lifecycleConfig");
}

// ===== Storage Configuration =====

/// Locations used by the directory-backed store and the fetch cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Root of the local blob store
    pub root_dir: PathBuf,
    /// Where downloaded assets are cached
    pub cache_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = std::env::temp_dir().join("cliprelay");
        Self {
            root_dir: base.join("storage"),
            cache_dir: base.join("cache"),
        }
    }
}

impl ConfigKey<StorageConfig> {
    pub const STORAGE: Self = Self::new("storageConfig");
}

// ===== Type-Safe Config Store =====

pub trait ConfigStore {
    fn get<T: DeserializeOwned>(&self, key: &ConfigKey<T>) -> Option<T>;
    fn set<T: Serialize>(&self, key: &ConfigKey<T>, value: T) -> Result<(), ConfigError>;
    fn delete<T>(&self, key: &ConfigKey<T>) -> Result<(), ConfigError>;
}

/// Configuration store persisted as one JSON object on disk
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let data = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config at {:?}, using defaults", path);
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, data: &BTreeMap<String, serde_json::Value>) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serde_json::to_vec_pretty(data)?)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    fn get<T: DeserializeOwned>(&self, key: &ConfigKey<T>) -> Option<T> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        let value = data.get(key.key_name())?.clone();
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Ignoring malformed '{}' config: {}", key.key_name(), e);
                None
            }
        }
    }

    fn set<T: Serialize>(&self, key: &ConfigKey<T>, value: T) -> Result<(), ConfigError> {
        let val = serde_json::to_value(value)?;
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.insert(key.key_name().to_string(), val);
        self.save(&data)
    }

    fn delete<T>(&self, key: &ConfigKey<T>) -> Result<(), ConfigError> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.remove(key.key_name());
        self.save(&data)
    }
}

pub fn load_lifecycle_config(store: &impl ConfigStore) -> LifecycleConfig {
    store.get(&ConfigKey::LIFECYCLE).unwrap_or_default()
}

pub fn load_storage_config(store: &impl ConfigStore) -> StorageConfig {
    store.get(&ConfigKey::STORAGE).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("config.json")).unwrap();
        (dir, store)
    }

    /// Object stored under `key` as it sits in the file on disk
    fn persisted(store: &JsonFileStore, key_name: &str) -> Option<serde_json::Value> {
        let bytes = std::fs::read(store.path()).ok()?;
        let mut root: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(&bytes).unwrap();
        root.remove(key_name)
    }

    fn assert_camel_case(name: &str, context: &str) {
        let mut chars = name.chars();
        let starts_lower = chars.next().is_some_and(|c| c.is_ascii_lowercase());
        assert!(
            starts_lower && chars.all(|c| c.is_ascii_alphanumeric()),
            "'{}' in {} is not camelCase",
            name,
            context
        );
    }

    /// Set, read back through a fresh open, check the file layout, delete
    fn assert_persists<T>(key: &ConfigKey<T>, value: T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug + Clone,
    {
        let (_dir, store) = temp_store();
        assert_camel_case(key.key_name(), "config keys");
        assert!(store.get(key).is_none());

        store.set(key, value.clone()).unwrap();
        let reopened = JsonFileStore::open(store.path()).unwrap();
        assert_eq!(reopened.get(key), Some(value));

        let on_disk = persisted(&reopened, key.key_name()).unwrap();
        for field in on_disk.as_object().unwrap().keys() {
            assert_camel_case(field, key.key_name());
        }

        reopened.delete(key).unwrap();
        assert!(persisted(&reopened, key.key_name()).is_none());
        assert!(JsonFileStore::open(store.path()).unwrap().get(key).is_none());
    }

    #[test]
    fn test_lifecycle_config_persists() {
        assert_persists(&ConfigKey::LIFECYCLE, LifecycleConfig::default());
        assert_persists(
            &ConfigKey::LIFECYCLE,
            LifecycleConfig {
                storage_ref: StorageRef::new("clips-latest"),
                compression_quality: CompressionQuality::High,
                refresh_delay_ms: 500,
                refresh_attempts: 1,
                refresh_backoff_ms: 0,
                record_options: RecordOptions {
                    quality: Some(0.5),
                    max_duration: Some(Duration::from_secs(10)),
                    mute: true,
                },
            },
        );
    }

    #[test]
    fn test_storage_config_persists() {
        assert_persists(
            &ConfigKey::STORAGE,
            StorageConfig {
                root_dir: PathBuf::from("/data/storage"),
                cache_dir: PathBuf::from("/data/cache"),
            },
        );
    }

    #[test]
    fn test_nested_record_options_are_camel_case() {
        let (_dir, store) = temp_store();
        let config = LifecycleConfig {
            record_options: RecordOptions {
                max_duration: Some(Duration::from_millis(1500)),
                ..Default::default()
            },
            ..Default::default()
        };
        store.set(&ConfigKey::LIFECYCLE, config).unwrap();

        let on_disk = persisted(&store, "lifecycleConfig").unwrap();
        assert_eq!(on_disk["recordOptions"]["maxDuration"], 1500);
        assert_eq!(on_disk["compressionQuality"], "low");
        assert_eq!(on_disk["storageRef"], "video");
    }

    #[test]
    fn test_default_lifecycle_values() {
        let config = LifecycleConfig::default();
        assert_eq!(config.storage_ref.as_str(), "video");
        assert_eq!(config.compression_quality, CompressionQuality::Low);
        assert_eq!(config.refresh_delay(), Duration::from_millis(2000));
        assert_eq!(config.refresh_backoff(), Duration::from_millis(1000));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "lifecycleConfig": { "refreshDelayMs": 3000, "compressionQuality": "medium" } }"#,
        )
        .unwrap();

        let config = load_lifecycle_config(&JsonFileStore::open(&path).unwrap());
        assert_eq!(config.refresh_delay_ms, 3000);
        assert_eq!(config.compression_quality, CompressionQuality::Medium);
        assert_eq!(config.storage_ref, StorageRef::default());
        assert_eq!(config.refresh_attempts, 3);
    }

    #[test]
    fn test_malformed_entry_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "storageConfig": { "rootDir": 42 } }"#).unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.get(&ConfigKey::STORAGE).is_none());
        assert_eq!(load_storage_config(&store), StorageConfig::default());
    }

    #[test]
    fn test_missing_parent_dirs_are_created_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let store = JsonFileStore::open(&path).unwrap();
        store
            .set(&ConfigKey::STORAGE, StorageConfig::default())
            .unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_json_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(ConfigError::Json(_))
        ));
    }
}
