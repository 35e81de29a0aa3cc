//! Platform secure storage bridge.
//!
//! The host implements [`SecureStoreFFI`] over Keychain (iOS) or
//! EncryptedSharedPreferences (Android).

use std::sync::Arc;

use async_trait::async_trait;
use yookassa_lib::secure_store::StoreResult;
use yookassa_lib::{SecureStore, StoreError, StoreErrorCode};

use crate::YookassaMobileError;

/// Secure key-value store provided by the host app.
#[uniffi::export(callback_interface)]
pub trait SecureStoreFFI: Send + Sync {
    /// Read a value; `None` when the key was never written.
    fn get(&self, key: String) -> Result<Option<String>, YookassaMobileError>;

    fn set(&self, key: String, value: String) -> Result<(), YookassaMobileError>;

    /// Remove a value. Removing a missing key must succeed.
    fn delete(&self, key: String) -> Result<(), YookassaMobileError>;
}

/// Adapts a host [`SecureStoreFFI`] to [`SecureStore`].
pub struct SecureStoreBridge {
    inner: Arc<dyn SecureStoreFFI>,
}

impl SecureStoreBridge {
    pub fn new(inner: Arc<dyn SecureStoreFFI>) -> Self {
        Self { inner }
    }
}

impl std::fmt::Debug for SecureStoreBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureStoreBridge").finish_non_exhaustive()
    }
}

fn store_error(key: &str, err: YookassaMobileError) -> StoreError {
    let code = match err {
        YookassaMobileError::Storage { .. } => StoreErrorCode::AccessDenied,
        YookassaMobileError::Unsupported { .. } => StoreErrorCode::Unavailable,
        _ => StoreErrorCode::Internal,
    };
    tracing::warn!(key, error = %err, "host secure store failed");
    StoreError::with_key(code, err.to_string(), key)
}

#[async_trait]
impl SecureStore for SecureStoreBridge {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner
            .get(key.to_string())
            .map_err(|e| store_error(key, e))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.inner
            .set(key.to_string(), value.to_string())
            .map_err(|e| store_error(key, e))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner
            .delete(key.to_string())
            .map_err(|e| store_error(key, e))
    }
}
