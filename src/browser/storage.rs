//! Storage backends available inside a content script.
//!
//! `chrome.storage.{sync,local}` is preferred. Pages loaded without the
//! extension runtime (local testing, a dev server) fall back to
//! `window.localStorage` with the same key and encoding.

use js_sys::{Function, Object, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::config::StorageArea;
use crate::error::StorageFailure;
use crate::store::StorageBackend;

/// Storage backend picked at startup.
pub enum BrowserStorage {
    Chrome(ChromeStorage),
    Local(LocalStorage),
}

impl BrowserStorage {
    /// Use `chrome.storage.<area>` when present, else `localStorage`.
    ///
    /// # Errors
    ///
    /// Returns a failure when neither is reachable.
    pub fn detect(area: StorageArea) -> Result<Self, StorageFailure> {
        if let Some(chrome) = ChromeStorage::detect(area) {
            log::debug!("using chrome.storage.{}", area.as_str());
            return Ok(Self::Chrome(chrome));
        }
        log::info!("chrome.storage unavailable, falling back to localStorage");
        LocalStorage::detect().map(Self::Local)
    }
}

#[async_trait::async_trait(?Send)]
impl StorageBackend for BrowserStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageFailure> {
        match self {
            Self::Chrome(inner) => inner.get(key).await,
            Self::Local(inner) => inner.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageFailure> {
        match self {
            Self::Chrome(inner) => inner.set(key, value).await,
            Self::Local(inner) => inner.set(key, value).await,
        }
    }
}

/// Promise-based `chrome.storage` area (Manifest V3).
pub struct ChromeStorage {
    area: JsValue,
    get_fn: Function,
    set_fn: Function,
}

impl ChromeStorage {
    #[must_use]
    pub fn detect(area: StorageArea) -> Option<Self> {
        let chrome = property(&js_sys::global(), "chrome")?;
        let storage = property(&chrome, "storage")?;
        let area = property(&storage, area.as_str())?;
        let Ok(get_fn) = property(&area, "get")?.dyn_into::<Function>() else {
            return None;
        };
        let Ok(set_fn) = property(&area, "set")?.dyn_into::<Function>() else {
            return None;
        };
        Some(Self { area, get_fn, set_fn })
    }

    async fn call(&self, func: &Function, arg: &JsValue) -> Result<JsValue, StorageFailure> {
        let returned = func.call1(&self.area, arg).map_err(js_failure)?;
        let promise = returned
            .dyn_into::<Promise>()
            .map_err(|_| StorageFailure::new("chrome.storage did not return a promise"))?;
        JsFuture::from(promise).await.map_err(js_failure)
    }
}

#[async_trait::async_trait(?Send)]
impl StorageBackend for ChromeStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageFailure> {
        let items = self.call(&self.get_fn, &JsValue::from_str(key)).await?;
        Ok(property(&items, key).and_then(|value| value.as_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageFailure> {
        let items = Object::new();
        Reflect::set(&items, &JsValue::from_str(key), &JsValue::from_str(value)).map_err(js_failure)?;
        self.call(&self.set_fn, &items).await.map(|_| ())
    }
}

/// Synchronous `window.localStorage`, exposed through the async seam.
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// # Errors
    ///
    /// Fails when there is no window or storage access is denied.
    pub fn detect() -> Result<Self, StorageFailure> {
        let window = web_sys::window().ok_or_else(|| StorageFailure::new("no window"))?;
        match window.local_storage() {
            Ok(Some(storage)) => Ok(Self { storage }),
            Ok(None) => Err(StorageFailure::new("localStorage not available")),
            Err(e) => Err(js_failure(e)),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl StorageBackend for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageFailure> {
        self.storage.get_item(key).map_err(js_failure)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageFailure> {
        self.storage.set_item(key, value).map_err(js_failure)
    }
}

/// Read `name` from `target`, treating `undefined`/`null` as missing.
pub(super) fn property(target: &JsValue, name: &str) -> Option<JsValue> {
    match Reflect::get(target, &JsValue::from_str(name)) {
        Ok(value) if !value.is_undefined() && !value.is_null() => Some(value),
        _ => None,
    }
}

fn js_failure(value: JsValue) -> StorageFailure {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return StorageFailure::new(String::from(error.message()));
    }
    if let Some(message) = property(&value, "message").and_then(|m| m.as_string()) {
        return StorageFailure::new(message);
    }
    match value.as_string() {
        Some(text) => StorageFailure::new(text),
        None => StorageFailure::new(format!("{value:?}")),
    }
}
