//! In-memory secure store implementation.
//!
//! This implementation is for testing and development only. Values are not
//! encrypted and are lost when the process exits.
//!
//! # Thread Safety
//!
//! Uses `RwLock` for thread-safe access. Lock poisoning is reported as an
//! error rather than a panic.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::traits::{SecureStore, StoreError, StoreErrorCode, StoreResult};

/// In-memory implementation of [`SecureStore`].
#[derive(Default)]
pub struct InMemorySecureStore {
    values: RwLock<HashMap<String, String>>,
}

fn lock_error(context: &str) -> StoreError {
    StoreError::new(
        StoreErrorCode::Internal,
        format!("InMemorySecureStore: lock poisoned during {}", context),
    )
}

impl InMemorySecureStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values.
    ///
    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.values.read().map(|v| v.len()).unwrap_or(0)
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .values
            .read()
            .map(|v| v.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl SecureStore for InMemorySecureStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let values = self.values.read().map_err(|_| lock_error("get"))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut values = self.values.write().map_err(|_| lock_error("set"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut values = self.values.write().map_err(|_| lock_error("delete"))?;
        values.remove(key);
        Ok(())
    }
}
