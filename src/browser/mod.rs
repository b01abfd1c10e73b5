//! Browser entry point and web-sys glue.
//!
//! SYSTEM CONTEXT
//! ==============
//! Compiled only with the `browser` feature. The extension's content-script
//! loader instantiates the wasm module and calls [`start`] (or
//! [`start_with_config`]); everything after that is driven from here.

pub mod dom;
pub mod storage;

use std::rc::Rc;

use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use wasm_bindgen::prelude::*;
use web_sys::Document;

use crate::config::ThemeConfig;
use crate::controller::ToggleController;
pub use dom::DomSurface;
pub use storage::{BrowserStorage, ChromeStorage, LocalStorage};

/// Runs spawned futures on the page's microtask queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

#[wasm_bindgen(start)]
pub fn boot() {
    console_error_panic_hook::set_once();
}

/// Start with the default Omnivox configuration.
///
/// # Errors
///
/// Fails when the page has no window or document.
#[wasm_bindgen]
pub fn start() -> Result<(), JsValue> {
    run(ThemeConfig::default())
}

/// Start with JSON overrides for [`ThemeConfig`].
///
/// # Errors
///
/// Fails on invalid configuration or when the page has no window or document.
#[wasm_bindgen(js_name = startWithConfig)]
pub fn start_with_config(json: &str) -> Result<(), JsValue> {
    let config = ThemeConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    run(config)
}

fn run(config: ThemeConfig) -> Result<(), JsValue> {
    install_logging(&config);

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;

    if document.ready_state() == "complete" {
        launch(config, document);
        return Ok(());
    }

    // Wait for the header to exist before looking for the anchor.
    let on_load = Closure::once_into_js(move || launch(config, document));
    window.add_event_listener_with_callback("load", on_load.unchecked_ref())
}

fn install_logging(config: &ThemeConfig) {
    let level = match config.log_level() {
        Ok(level) => level,
        Err(e) => {
            web_sys::console::warn_1(&JsValue::from_str(&e.to_string()));
            log::LevelFilter::Info
        }
    };
    let Some(level) = level.to_level() else {
        return;
    };
    if let Err(e) = console_log::init_with_level(level) {
        log::debug!("logger already installed: {e}");
    }
}

fn launch(config: ThemeConfig, document: Document) {
    let storage = match BrowserStorage::detect(config.storage_area) {
        Ok(storage) => storage,
        Err(e) => {
            log::error!("theme storage unavailable: {e}");
            return;
        }
    };

    let surface = DomSurface::new(document, &config);
    let icon = surface.clone();
    let controller = Rc::new(ToggleController::from_config(storage, surface, &config));
    controller.on_change(move |theme| icon.refresh_icon(theme));

    wasm_bindgen_futures::spawn_local(async move {
        match controller.start(BrowserSpawner).await {
            Ok(mounted) => log::debug!("theme controller started (toggle mounted: {mounted})"),
            Err(e) => log::error!("theme controller failed to start: {e}"),
        }
    });
}
