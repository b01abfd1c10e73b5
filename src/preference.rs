//! The single persisted setting: dark or light theme.
//!
//! Storage encodes the value as the question "is dark mode on?", so `dark` is
//! written as `yes` and `light` as `no`. Any other stored string decodes to
//! `None` and is handled like an unconfigured preference.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "preference_test.rs"]
mod preference_test;

/// Visual theme applied to the host page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemePreference {
    /// Dark theme. Default when nothing has been stored yet.
    #[default]
    #[serde(rename = "yes")]
    Dark,
    /// Light ("vanilla") theme; the root marker class is present.
    #[serde(rename = "no")]
    Light,
}

impl ThemePreference {
    /// Value written to the storage backend.
    #[must_use]
    pub fn as_stored(self) -> &'static str {
        match self {
            Self::Dark => "yes",
            Self::Light => "no",
        }
    }

    /// Decode a stored value. Unknown strings yield `None`.
    #[must_use]
    pub fn from_stored(raw: &str) -> Option<Self> {
        match raw {
            "yes" => Some(Self::Dark),
            "no" => Some(Self::Light),
            _ => None,
        }
    }

    /// The other theme.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    #[must_use]
    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }

    /// Whether the root marker class should be present for this theme.
    #[must_use]
    pub fn marker_present(self) -> bool {
        self == Self::Light
    }
}

impl std::fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Dark => "dark",
            Self::Light => "light",
        })
    }
}
