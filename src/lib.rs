//! # omnivox-dark
//!
//! Content script that switches a page between dark and light themes and
//! remembers the choice in extension storage.
//!
//! Without the `browser` feature the crate is a pure-Rust core that runs
//! natively: the controller drives a [`surface::ThemeSurface`] and a
//! [`store::StorageBackend`], both of which have in-memory implementations.
//! The `browser` feature adds the web-sys surface, the `chrome.storage`
//! backend and the wasm entry points.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`preference`] | The two-valued [`ThemePreference`] and its stored encoding |
//! | [`store`] | Storage backend seam and the single-key [`PreferenceStore`] |
//! | [`surface`] | Page-side effects: root marker and toggle control |
//! | [`controller`] | [`ToggleController`]: init, bind, toggle |
//! | [`config`] | [`ThemeConfig`] defaults and JSON overrides |
//! | [`error`] | [`ThemeError`] and [`StorageFailure`] |
//! | `browser` | web-sys glue and entry points (`browser` feature) |

pub mod config;
pub mod controller;
pub mod error;
pub mod preference;
pub mod store;
pub mod surface;

#[cfg(feature = "browser")]
pub mod browser;

pub use config::{StorageArea, ThemeConfig, WriteFailurePolicy};
pub use controller::{ControllerState, ToggleController, ToggleOutcome};
pub use error::{StorageFailure, ThemeError};
pub use preference::ThemePreference;
pub use store::{MemoryBackend, PreferenceStore, StorageBackend};
pub use surface::{HeadlessSurface, ThemeSurface};
