//! Durable key-value storage for favorites and settings.
//!
//! Every operation on [`Persistence`] is best-effort: unreadable data falls back to
//! defaults and failed writes are logged, never returned. The in-memory state owned by
//! the caller is never rolled back, so after a failed write the session and the store
//! may disagree until the next successful save.

use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    error::StorageError,
    model::{Favorites, Settings},
};

pub const FAVORITES_KEY: &str = "favorites";
pub const SETTINGS_KEY: &str = "settings";

/// Raw string storage addressed by key.
pub trait KeyValueStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { key: key.to_string(), source }),
        }
    }

    /// Writes to a temp file, syncs, then renames over the target so a crash never
    /// leaves a half-written value behind.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io { key: key.to_string(), source };

        fs::create_dir_all(&self.dir).map_err(io_err)?;

        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");

        let mut f = fs::File::create(&temp_path).map_err(io_err)?;
        f.write_all(value.as_bytes()).map_err(io_err)?;
        f.sync_all().map_err(io_err)?;
        drop(f);

        fs::rename(&temp_path, &path).map_err(io_err)?;
        Ok(())
    }
}

/// In-process store. Writes can be switched off to simulate a full quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    reject_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries.lock().insert(key.to_string(), value.to_string());
        self
    }

    pub fn reject_writes(&self, reject: bool) {
        *self.reject_writes.lock() = reject;
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if *self.reject_writes.lock() {
            return Err(StorageError::Rejected {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// Favorites and settings on top of a [`KeyValueStore`].
pub struct Persistence {
    store: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}

impl Persistence {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self { store: Box::new(store) }
    }

    /// Persisted favorites; empty when missing or unreadable.
    pub fn load_favorites(&self) -> Favorites {
        match self.read_json::<Vec<String>>(FAVORITES_KEY) {
            Some(cities) => Favorites::from(cities),
            None => Favorites::new(),
        }
    }

    pub fn save_favorites(&self, favorites: &Favorites) {
        self.write_json(FAVORITES_KEY, favorites.as_slice());
    }

    /// Persisted settings merged over the defaults.
    pub fn load_settings(&self) -> Settings {
        self.read_json::<Settings>(SETTINGS_KEY).unwrap_or_default()
    }

    pub fn save_settings(&self, settings: &Settings) {
        self.write_json(SETTINGS_KEY, settings);
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "nothing stored yet");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "storage read failed; using defaults");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(source) => {
                let e = StorageError::Corrupt { key: key.to_string(), source };
                warn!(key, error = %e, "discarding corrupt stored value");
                None
            }
        }
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize value for storage");
                return;
            }
        };

        if let Err(e) = self.store.set(key, &json) {
            warn!(key, error = %e, "storage write failed; in-memory state kept");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TemperatureUnit, Theme};
    use std::sync::Arc;

    #[test]
    fn empty_store_yields_empty_favorites_and_default_settings() {
        let p = Persistence::new(MemoryStore::new());
        assert!(p.load_favorites().is_empty());
        assert_eq!(p.load_settings(), Settings::default());
    }

    #[test]
    fn favorites_roundtrip_in_order() {
        let p = Persistence::new(MemoryStore::new());
        let favs = Favorites::from(vec!["Paris".to_string(), "Oslo".to_string()]);
        p.save_favorites(&favs);
        assert_eq!(p.load_favorites(), favs);
    }

    #[test]
    fn favorites_stored_as_json_array() {
        let store = Arc::new(MemoryStore::new());
        let p = Persistence::new(Arc::clone(&store));
        p.save_favorites(&Favorites::from(vec!["Paris".to_string()]));
        assert_eq!(store.get(FAVORITES_KEY).unwrap().as_deref(), Some(r#"["Paris"]"#));
    }

    #[test]
    fn corrupt_favorites_yield_empty() {
        let store = MemoryStore::new().with_entry(FAVORITES_KEY, "{not json");
        let p = Persistence::new(store);
        assert!(p.load_favorites().is_empty());
    }

    #[test]
    fn save_then_load_settings_returns_both_fields() {
        let p = Persistence::new(MemoryStore::new());
        let settings = Settings { unit: TemperatureUnit::Fahrenheit, theme: Theme::Dark };
        p.save_settings(&settings);
        assert_eq!(p.load_settings(), settings);
    }

    #[test]
    fn malformed_settings_yield_exact_defaults() {
        let store = MemoryStore::new().with_entry(SETTINGS_KEY, "unit=F;theme=dark");
        let p = Persistence::new(store);
        assert_eq!(
            p.load_settings(),
            Settings { unit: TemperatureUnit::Celsius, theme: Theme::Light }
        );
    }

    #[test]
    fn invalid_enum_value_never_leaks_partially() {
        let store = MemoryStore::new().with_entry(SETTINGS_KEY, r#"{"unit":"K","theme":"dark"}"#);
        let p = Persistence::new(store);
        assert_eq!(p.load_settings(), Settings::default());
    }

    #[test]
    fn partial_settings_merge_over_defaults() {
        let store = MemoryStore::new().with_entry(SETTINGS_KEY, r#"{"unit":"F"}"#);
        let p = Persistence::new(store);
        let s = p.load_settings();
        assert_eq!(s.unit, TemperatureUnit::Fahrenheit);
        assert_eq!(s.theme, Theme::Light);
    }

    #[test]
    fn rejected_write_is_swallowed_and_keeps_previous_value() {
        let store = Arc::new(MemoryStore::new());
        let p = Persistence::new(Arc::clone(&store));
        p.save_favorites(&Favorites::from(vec!["Paris".to_string()]));

        store.reject_writes(true);
        p.save_favorites(&Favorites::from(vec!["Paris".to_string(), "Oslo".to_string()]));

        assert_eq!(p.load_favorites().as_slice(), ["Paris"]);
    }

    #[test]
    fn file_store_roundtrips_and_reports_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        assert!(store.get("settings").unwrap().is_none());
        store.set("settings", r#"{"unit":"F"}"#).unwrap();
        assert_eq!(store.get("settings").unwrap().as_deref(), Some(r#"{"unit":"F"}"#));
        assert!(!dir.path().join("data").join("settings.json.tmp").exists());
    }

    #[test]
    fn file_store_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let p = Persistence::new(FileStore::new(dir.path()));

        p.save_settings(&Settings { unit: TemperatureUnit::Fahrenheit, theme: Theme::Light });
        p.save_settings(&Settings { unit: TemperatureUnit::Celsius, theme: Theme::Dark });

        let s = p.load_settings();
        assert_eq!(s.unit, TemperatureUnit::Celsius);
        assert_eq!(s.theme, Theme::Dark);
    }
}
