//! JSON key-value files backing the persisted extension state and the global
//! settings. Each file is a single JSON object; keys this crate does not know
//! about are carried through untouched.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dirs::config_dir;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

pub const STATE_PATH_ENV: &str = "RAINBOW_TABS_STATE_PATH";
pub const SETTINGS_PATH_ENV: &str = "RAINBOW_TABS_SETTINGS_PATH";

const APP_DIR: &str = "rainbow-tabs";
const STATE_FILE: &str = "state.json";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("config directory unavailable")]
    MissingConfigDir,
    #[error("{} does not contain a JSON object", .path.display())]
    NotAnObject { path: PathBuf },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Default)]
pub struct JsonStore {
    path: Option<PathBuf>,
    values: Map<String, Value>,
}

impl JsonStore {
    /// A store that never touches disk. Used when no storage path can be
    /// resolved.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let values = match fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => match serde_json::from_str::<Value>(&contents)? {
                Value::Object(values) => values,
                _ => {
                    return Err(StoreError::NotAnObject {
                        path: path.to_path_buf(),
                    })
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            values,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads `key`, returning `None` when it is unset or holds a value of a
    /// different shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(key, ?err, "ignoring stored value with unexpected shape");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Sets `key` and writes the whole file. If the write fails, the previous
    /// value of `key` is put back so memory never runs ahead of disk.
    pub fn update<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        let previous = self.values.insert(key.to_string(), value);

        if let Err(err) = self.save() {
            match previous {
                Some(previous) => self.values.insert(key.to_string(), previous),
                None => self.values.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(&self.values)?;
        fs::write(path, data)?;
        Ok(())
    }
}

pub fn state_path() -> Result<PathBuf, StoreError> {
    resolve_path(STATE_PATH_ENV, STATE_FILE)
}

pub fn settings_path() -> Result<PathBuf, StoreError> {
    resolve_path(SETTINGS_PATH_ENV, SETTINGS_FILE)
}

/// Loads the persisted extension state (`globalState`).
pub fn open_state() -> Result<JsonStore, StoreError> {
    JsonStore::load_from_path(state_path()?)
}

/// Loads the global settings file.
pub fn open_settings() -> Result<JsonStore, StoreError> {
    JsonStore::load_from_path(settings_path()?)
}

fn resolve_path(env_var: &str, file_name: &str) -> Result<PathBuf, StoreError> {
    if let Ok(custom) = env::var(env_var) {
        return Ok(PathBuf::from(custom));
    }
    let base = config_dir().ok_or(StoreError::MissingConfigDir)?;
    Ok(base.join(APP_DIR).join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn load_missing_file_returns_empty_store() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");

        let store = JsonStore::load_from_path(&path).expect("load store");

        assert_eq!(store.get::<bool>("anything"), None);
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn update_writes_pretty_snapshot_and_creates_parents() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");

        let mut store = JsonStore::load_from_path(&path).expect("load store");
        store.update("flag", &true).expect("update flag");

        let contents = fs::read_to_string(&path).expect("read snapshot");
        let value: Value = serde_json::from_str(&contents).expect("parse snapshot");
        assert_eq!(value, json!({"flag": true}));
        assert!(contents.contains('\n'));
    }

    #[test]
    fn unknown_keys_survive_a_save() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"editor.fontSize": 14}"#).expect("seed settings");

        let mut store = JsonStore::load_from_path(&path).expect("load store");
        store.update("flag", &false).expect("update flag");

        let reloaded = JsonStore::load_from_path(&path).expect("reload store");
        assert_eq!(reloaded.get::<u32>("editor.fontSize"), Some(14));
        assert_eq!(reloaded.get::<bool>("flag"), Some(false));
    }

    #[test]
    fn mismatched_value_shape_reads_as_unset() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"flag": "yes"}"#).expect("seed state");

        let store = JsonStore::load_from_path(&path).expect("load store");
        assert_eq!(store.get::<bool>("flag"), None);
    }

    #[test]
    fn non_object_file_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2, 3]").expect("seed state");

        let err = JsonStore::load_from_path(&path).expect_err("array should be rejected");
        assert!(matches!(err, StoreError::NotAnObject { .. }));
    }

    #[test]
    fn failed_update_keeps_previous_value() {
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        let path = blocker.join("state.json");

        let mut store = JsonStore::load_from_path(&path).expect("load store");
        store.update("flag", &true).expect("update flag");

        fs::remove_dir_all(&blocker).expect("remove state dir");
        fs::write(&blocker, "not a directory").expect("replace state dir with a file");

        assert!(store.update("flag", &false).is_err());
        assert_eq!(store.get::<bool>("flag"), Some(true));

        assert!(store.update("other", &1).is_err());
        assert_eq!(store.get::<u32>("other"), None);
    }

    #[test]
    fn in_memory_store_does_not_touch_disk() {
        let mut store = JsonStore::in_memory();
        store.update("flag", &true).expect("update in memory");
        assert_eq!(store.get::<bool>("flag"), Some(true));
        assert_eq!(store.path(), None);
    }

    #[test]
    fn missing_config_dir_error_message() {
        let message = StoreError::MissingConfigDir.to_string();
        assert_eq!(message, "config directory unavailable");
    }
}
