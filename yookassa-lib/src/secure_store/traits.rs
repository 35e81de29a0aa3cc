//! Core trait for the secure key-value store.

use std::fmt;

use async_trait::async_trait;

/// Error codes for secure store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum StoreErrorCode {
    /// Access denied (device locked, auth required)
    AccessDenied = 2000,
    /// Stored value is not valid UTF-8 or JSON
    Corrupted = 4000,
    /// Store is not available on this platform
    Unavailable = 6000,
    /// Underlying I/O failure
    Io = 7000,
    /// Internal error
    Internal = 9999,
}

/// Error type for secure store operations.
#[derive(Debug, Clone)]
pub struct StoreError {
    /// Error code for FFI/mobile integration
    pub code: StoreErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Storage key related to error (if applicable)
    pub key: Option<String>,
}

impl StoreError {
    /// Create a new error.
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            key: None,
        }
    }

    /// Create a new error with the associated key.
    pub fn with_key(code: StoreErrorCode, message: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create a "corrupted value" error.
    pub fn corrupted(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::with_key(
            StoreErrorCode::Corrupted,
            format!("stored value is corrupted: {}", reason),
            key,
        )
    }

    /// Create an I/O error.
    pub fn io(key: impl Into<String>, err: std::io::Error) -> Self {
        Self::with_key(StoreErrorCode::Io, err.to_string(), key)
    }

    /// Create an "unavailable" error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Unavailable, reason)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(key) = &self.key {
            write!(f, "{} (key: {})", self.message, key)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for StoreError {}

/// Result type for secure store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Platform-agnostic secure key-value store.
///
/// Values are small UTF-8 strings (JSON blobs or plain ids). All operations
/// are async and may be called concurrently; the store imposes no ordering
/// between writers.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Read a value, or `None` if the key was never written.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value, overwriting any previous one.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a value.
    ///
    /// Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}
