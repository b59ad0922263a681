use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::middleware::TokenSource;
use crate::error::StorageError;
use crate::storage::Storage;
use crate::store::atom::{Atom, SubscriptionId};

/// Write to a persisted atom: a new value, or back to the default with the key removed
#[derive(Debug, Clone, PartialEq)]
pub enum AtomUpdate<T> {
    Set(T),
    Reset,
}

/// Atom mirrored into a storage slot
pub struct PersistedAtom<T> {
    key: String,
    default: T,
    storage: Arc<dyn Storage>,
    atom: Atom<T>,
}

impl<T: Clone> Clone for PersistedAtom<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            default: self.default.clone(),
            storage: Arc::clone(&self.storage),
            atom: self.atom.clone(),
        }
    }
}

impl<T> PersistedAtom<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Load the initial value from storage, falling back to `default`
    pub fn new(key: impl Into<String>, default: T, storage: Arc<dyn Storage>) -> Self {
        let key = key.into();
        let initial = match read_slot::<T>(storage.as_ref(), &key) {
            Ok(Some(value)) => value,
            Ok(None) => default.clone(),
            Err(e) => {
                tracing::warn!("Ignoring stored value for '{}': {}", key, e);
                default.clone()
            }
        };

        Self {
            key,
            default,
            storage,
            atom: Atom::new(initial),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> T {
        self.atom.get()
    }

    /// Read the slot straight from storage, bypassing the in-memory mirror
    pub fn read_persisted(&self) -> Result<Option<T>, StorageError> {
        read_slot(self.storage.as_ref(), &self.key)
    }

    pub fn set(&self, value: T) -> Result<(), StorageError> {
        let encoded = serde_json::to_value(&value).map_err(|e| StorageError::Value {
            key: self.key.clone(),
            message: e.to_string(),
        })?;
        self.storage.set_item(&self.key, encoded)?;
        self.atom.set(value);
        Ok(())
    }

    pub fn reset(&self) -> Result<(), StorageError> {
        self.storage.remove_item(&self.key)?;
        self.atom.set(self.default.clone());
        Ok(())
    }

    pub fn apply(&self, update: AtomUpdate<T>) -> Result<(), StorageError> {
        match update {
            AtomUpdate::Set(value) => self.set(value),
            AtomUpdate::Reset => self.reset(),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        self.atom.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.atom.unsubscribe(id)
    }
}

fn read_slot<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<Option<T>, StorageError> {
    match storage.get_item(key)? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StorageError::Value {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

impl TokenSource for PersistedAtom<Option<String>> {
    fn access_token(&self) -> Option<String> {
        self.get()
    }
}
