use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

pub const KEY_TOKEN: &str = "token";
pub const KEY_REFRESH_TOKEN: &str = "refreshToken";
pub const KEY_TOKEN_EXPIRY: &str = "tokenExpiry";
pub const KEY_USER: &str = "user";
pub const KEY_REMEMBER_ME: &str = "rememberMe";

pub const SESSION_KEYS: [&str; 5] = [
    KEY_TOKEN,
    KEY_REFRESH_TOKEN,
    KEY_TOKEN_EXPIRY,
    KEY_USER,
    KEY_REMEMBER_ME,
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// String-valued persisted key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Reads a key, treating blank values as absent.
    fn get_string(&self, key: &str) -> Option<String> {
        let v = self.get(key)?;
        let s = v.trim();
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(key);
        Ok(())
    }
}

/// JSON-object file store, saved after every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl FileStore {
    /// Opens the store at `path`. A missing or corrupt file starts empty; any
    /// other read failure is returned.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    log::warn!("ignoring malformed store file {}", path.display());
                    Map::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
            Err(e) => {
                log::warn!("cannot read store file {}: {e}", path.display());
                return Err(e.into());
            }
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key)?.as_str().map(|s| s.to_string())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&guard)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if guard.remove(key).is_none() {
            return Ok(());
        }
        self.save(&guard)
    }
}
