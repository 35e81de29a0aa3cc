//! File-backed secure store.
//!
//! Each key is written to its own file under a base directory. File names
//! are the hex SHA-256 of the key: fixed length whatever the key, and free
//! of path separators. Writes go through a uniquely named temporary file and
//! a rename, so a crash or a racing writer never leaves a half-written value.
//!
//! Values are not encrypted; rely on OS-level file protection. Mobile hosts
//! should supply their keychain through the FFI layer instead.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::traits::{SecureStore, StoreError, StoreResult};

/// File-per-key implementation of [`SecureStore`].
pub struct FileSecureStore {
    base_path: PathBuf,
}

impl FileSecureStore {
    /// Open (creating if needed) a store rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)
            .map_err(|e| StoreError::io(base_path.display().to_string(), e))?;
        Ok(Self { base_path })
    }

    /// Directory holding the value files.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.base_path.join(hex::encode(Sha256::digest(key.as_bytes())))
    }
}

#[async_trait]
impl SecureStore for FileSecureStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.value_path(key);
        match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| StoreError::corrupted(key, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.value_path(key);
        let mut tmp = NamedTempFile::new_in(&self.base_path).map_err(|e| StoreError::io(key, e))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| StoreError::io(key, e))?;
        tmp.persist(&path)
            .map(|_| ())
            .map_err(|e| StoreError::io(key, e.error))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match std::fs::remove_file(self.value_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }
}
