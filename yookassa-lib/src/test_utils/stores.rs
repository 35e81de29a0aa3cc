//! Secure store doubles.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::secure_store::{InMemorySecureStore, SecureStore, StoreError, StoreErrorCode, StoreResult};

/// In-memory store that counts every call.
#[derive(Default)]
pub struct RecordingStore {
    inner: InMemorySecureStore,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    pub fn reset_counts(&self) {
        self.gets.store(0, Ordering::SeqCst);
        self.sets.store(0, Ordering::SeqCst);
        self.deletes.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl SecureStore for RecordingStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }
}

/// Store that rejects every operation, as a locked keychain would.
#[derive(Default)]
pub struct FailingStore;

impl FailingStore {
    pub fn new() -> Self {
        Self
    }

    fn error(key: &str) -> StoreError {
        StoreError::with_key(StoreErrorCode::AccessDenied, "keychain is locked", key)
    }
}

#[async_trait]
impl SecureStore for FailingStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Err(Self::error(key))
    }

    async fn set(&self, key: &str, _value: &str) -> StoreResult<()> {
        Err(Self::error(key))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        Err(Self::error(key))
    }
}
