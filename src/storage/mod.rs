//! Persistent client storage.
//!
//! A small keyed document standing in for browser local storage. The
//! session keeps three slots in it:
//!
//! ```text
//! accessToken  → "eyJhbGciOi..."        (raw token string, absent when logged out)
//! darkMode     → false
//! currentUser  → { "id": ..., ... } | null
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::config::AppConfig;
use crate::error::StorageError;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const DARK_MODE_KEY: &str = "darkMode";
pub const CURRENT_USER_KEY: &str = "currentUser";

const STORAGE_FILE: &str = "storage.json";

/// Keyed JSON value store
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn set_item(&self, key: &str, value: Value) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Storage kept in one JSON document on disk
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        }

        Ok(Self {
            path: dir.join(STORAGE_FILE),
            lock: Mutex::new(()),
        })
    }

    /// Open storage in the configured directory
    pub fn from_config(config: &AppConfig) -> Result<Self, StorageError> {
        let dir = match &config.storage.dir {
            Some(dir) => dir.clone(),
            None => default_storage_dir()?,
        };
        Self::new(dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| io_error(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::Corrupt(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(StorageError::Corrupt(e.to_string())),
        }
    }

    fn save(&self, document: &Map<String, Value>) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(document)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| io_error(&self.path, e))
    }

    fn modify<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut document = self.load()?;
        f(&mut document);
        self.save(&document)
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.modify(|document| {
            document.insert(key.to_string(), value);
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|document| {
            document.remove(key);
        })
    }
}

/// Process-local storage, used by tests and embedders without a config dir
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let items = self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        items.remove(key);
        Ok(())
    }
}

pub fn default_storage_dir() -> Result<PathBuf, StorageError> {
    let home = std::env::var("HOME")
        .map_err(|_| StorageError::Unavailable("HOME environment variable not set".to_string()))?;
    Ok(PathBuf::from(home).join(".config").join("coffeeshop"))
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
