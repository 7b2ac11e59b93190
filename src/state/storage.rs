//! Durable key/value backends underneath the token store.
//!
//! SYSTEM CONTEXT
//! ==============
//! The browser build persists to `localStorage`; the CLI persists to a JSON
//! file; tests and non-browser defaults use memory. All of them expose the
//! same string-keyed interface so the token store's group writes stay
//! backend-agnostic.
//!
//! TRADE-OFFS
//! ==========
//! `FileStorage` rewrites the whole file on every mutation. The file holds
//! four small keys, so simplicity wins over incremental writes.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ClientError;

pub trait StorageBackend {
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] when the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] when the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.entries.borrow_mut().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// JSON-object file backend for native tools.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, ClientError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(storage_error(&self.path, &e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        // A mangled file is treated as empty rather than locking the user out.
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable session file");
            BTreeMap::new()
        }))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, &e))?;
        }
        let raw = serde_json::to_string_pretty(entries).map_err(|e| ClientError::Storage(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| storage_error(&self.path, &e))
    }
}

fn storage_error(path: &Path, err: &std::io::Error) -> ClientError {
    ClientError::Storage(format!("{}: {err}", path.display()))
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

// =============================================================================
// BROWSER
// =============================================================================

#[cfg(feature = "hydrate")]
pub use browser::LocalStorage;

#[cfg(feature = "hydrate")]
mod browser {
    use super::StorageBackend;
    use crate::error::ClientError;

    /// `window.localStorage` backend.
    pub struct LocalStorage {
        storage: web_sys::Storage,
    }

    impl LocalStorage {
        /// # Errors
        ///
        /// Returns [`ClientError::Storage`] when there is no window or the
        /// browser denies storage access (private mode, disabled cookies).
        pub fn open() -> Result<Self, ClientError> {
            let window = web_sys::window().ok_or_else(|| ClientError::Storage("no window".to_owned()))?;
            let storage = window
                .local_storage()
                .map_err(|e| ClientError::Storage(format!("{e:?}")))?
                .ok_or_else(|| ClientError::Storage("localStorage disabled".to_owned()))?;
            Ok(Self { storage })
        }
    }

    impl StorageBackend for LocalStorage {
        fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
            self.storage.get_item(key).map_err(|e| ClientError::Storage(format!("{e:?}")))
        }

        fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
            self.storage
                .set_item(key, value)
                .map_err(|e| ClientError::Storage(format!("{e:?}")))
        }

        fn remove(&self, key: &str) -> Result<(), ClientError> {
            self.storage.remove_item(key).map_err(|e| ClientError::Storage(format!("{e:?}")))
        }
    }
}
