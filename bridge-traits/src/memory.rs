//! In-memory storage adapters
//!
//! Used by headless hosts that have no durable storage and by tests across the
//! workspace. Contents are lost when the process exits.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{BridgeError, Result};
use crate::storage::{LocalStore, SecureStore};

#[derive(Debug, Clone, PartialEq)]
enum StoredValue {
    Text(String),
    Integer(i64),
}

/// [`LocalStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, StoredValue>) -> T) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| BridgeError::Storage("memory store lock poisoned".to_string()))?;
        Ok(f(&mut entries))
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), StoredValue::Text(value.to_string()));
        })
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|entries| match entries.get(key) {
            Some(StoredValue::Text(value)) => Some(value.clone()),
            Some(StoredValue::Integer(value)) => Some(value.to_string()),
            None => None,
        })
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), StoredValue::Integer(value));
        })
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        let value = self.with_entries(|entries| entries.get(key).cloned())?;
        match value {
            None => Ok(None),
            Some(StoredValue::Integer(value)) => Ok(Some(value)),
            Some(StoredValue::Text(text)) => text.parse().map(Some).map_err(|_| {
                BridgeError::Storage(format!("value for '{}' is not an integer", key))
            }),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        self.with_entries(|entries| entries.contains_key(key))
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        self.with_entries(|entries| {
            let mut keys: Vec<String> = entries.keys().cloned().collect();
            keys.sort();
            keys
        })
    }
}

/// [`SecureStore`] backed by a `HashMap`. Not encrypted.
#[derive(Debug, Default)]
pub struct MemorySecureStore {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.secrets
            .lock()
            .map_err(|_| BridgeError::Storage("memory store lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .secrets
            .lock()
            .map_err(|_| BridgeError::Storage("memory store lock poisoned".to_string()))?
            .get(key)
            .cloned())
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        self.secrets
            .lock()
            .map_err(|_| BridgeError::Storage("memory store lock poisoned".to_string()))?
            .remove(key);
        Ok(())
    }
}
