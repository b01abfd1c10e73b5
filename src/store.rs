//! Preference persistence over an asynchronous key-value backend.
//!
//! DESIGN
//! ======
//! [`StorageBackend`] is the seam to whatever the host provides
//! (`chrome.storage`, `localStorage`, or memory in tests). It deals only in
//! string keys and values. [`PreferenceStore`] narrows it to the one key this
//! crate owns and handles the `yes`/`no` encoding. Neither layer retries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{StorageFailure, ThemeError};
use crate::preference::ThemePreference;

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

/// Asynchronous string key-value storage. Single-threaded, so futures need
/// not be `Send`.
#[async_trait::async_trait(?Send)]
pub trait StorageBackend {
    /// Read `key`. `Ok(None)` means the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageFailure>;

    /// Write `value` under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageFailure>;
}

/// In-memory backend. Clones share the same map, so a second
/// [`PreferenceStore`] over a clone observes earlier writes the way a reload
/// observes persisted storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Rc<RefCell<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: HashMap<String, String>,
    writes: usize,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value without counting it as a write.
    #[must_use]
    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.inner.borrow_mut().values.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Raw value currently held for `key`.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.borrow().values.get(key).cloned()
    }

    /// Number of successful `set` calls so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.inner.borrow().writes
    }
}

#[async_trait::async_trait(?Send)]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageFailure> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageFailure> {
        let mut inner = self.inner.borrow_mut();
        inner.values.insert(key.to_owned(), value.to_owned());
        inner.writes += 1;
        Ok(())
    }
}

/// Reads and writes the theme preference under one storage key.
#[derive(Debug, Clone)]
pub struct PreferenceStore<B> {
    backend: B,
    key: String,
}

impl<B> PreferenceStore<B> {
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self { backend, key: key.into() }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<B: StorageBackend> PreferenceStore<B> {
    /// Load the stored preference.
    ///
    /// Returns `Ok(None)` when nothing is stored or the stored value is not a
    /// recognised encoding.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::StorageRead`] when the backend reports a failure.
    pub async fn get(&self) -> Result<Option<ThemePreference>, ThemeError> {
        let raw = self.backend.get(&self.key).await.map_err(ThemeError::StorageRead)?;
        Ok(raw.and_then(|value| {
            let decoded = ThemePreference::from_stored(&value);
            if decoded.is_none() {
                log::warn!("ignoring invalid stored theme: key={} value={value:?}", self.key);
            }
            decoded
        }))
    }

    /// Persist `theme`.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::StorageWrite`] when the backend reports a failure.
    pub async fn set(&self, theme: ThemePreference) -> Result<(), ThemeError> {
        self.backend
            .set(&self.key, theme.as_stored())
            .await
            .map_err(ThemeError::StorageWrite)
    }
}
