//! Typed configuration for the content script.
//!
//! Defaults target the Omnivox header layout. A host can override any field by
//! passing a JSON object; missing fields keep their defaults.

use log::LevelFilter;
use serde::Deserialize;

use crate::error::ThemeError;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_STORAGE_KEY: &str = "dark_mode";
pub const DEFAULT_ANCHOR_ID: &str = "wrapper-headerOmnivoxLogo";
pub const DEFAULT_MARKER_CLASS: &str = "vanilla";
pub const DEFAULT_TOGGLE_ID: &str = "themeToggle";
pub const DEFAULT_TOGGLE_TITLE: &str = "Toggle Light/Dark Mode";
pub const DEFAULT_ICON_PATH: &str = "/dist/inject/icon.svg";

/// Which `chrome.storage` area holds the preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageArea {
    /// Synced across the user's browsers.
    #[default]
    Sync,
    /// Local to this browser profile.
    Local,
}

impl StorageArea {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Local => "local",
        }
    }
}

/// What the controller does when persisting a toggled preference fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteFailurePolicy {
    /// Keep the page and in-memory state on the new theme. Storage still holds
    /// the previous value until the next successful write.
    #[default]
    Keep,
    /// Revert the page and in-memory state to the previous theme.
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub storage_key: String,
    pub storage_area: StorageArea,
    pub anchor_id: String,
    pub marker_class: String,
    pub toggle_id: String,
    pub toggle_title: String,
    pub icon_path: String,
    pub on_write_failure: WriteFailurePolicy,
    pub log_level: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            storage_area: StorageArea::Sync,
            anchor_id: DEFAULT_ANCHOR_ID.to_owned(),
            marker_class: DEFAULT_MARKER_CLASS.to_owned(),
            toggle_id: DEFAULT_TOGGLE_ID.to_owned(),
            toggle_title: DEFAULT_TOGGLE_TITLE.to_owned(),
            icon_path: DEFAULT_ICON_PATH.to_owned(),
            on_write_failure: WriteFailurePolicy::Keep,
            log_level: "info".to_owned(),
        }
    }
}

impl ThemeConfig {
    /// Parse a JSON override object.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::Config`] if the JSON is malformed, a field has the
    /// wrong type, an identifier is empty, or `log_level` is not a known level.
    pub fn from_json(raw: &str) -> Result<Self, ThemeError> {
        let config: Self = serde_json::from_str(raw).map_err(|e| ThemeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed log level.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::Config`] for an unknown level name.
    pub fn log_level(&self) -> Result<LevelFilter, ThemeError> {
        parse_log_level(&self.log_level)
    }

    fn validate(&self) -> Result<(), ThemeError> {
        for (name, value) in [
            ("storage_key", &self.storage_key),
            ("anchor_id", &self.anchor_id),
            ("marker_class", &self.marker_class),
            ("toggle_id", &self.toggle_id),
        ] {
            if value.trim().is_empty() {
                return Err(ThemeError::Config(format!("{name} must not be empty")));
            }
        }
        self.log_level().map(|_| ())
    }
}

fn parse_log_level(raw: &str) -> Result<LevelFilter, ThemeError> {
    raw.trim()
        .parse::<LevelFilter>()
        .map_err(|_| ThemeError::Config(format!("unknown log level: {raw}")))
}
