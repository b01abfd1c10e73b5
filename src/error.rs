//! Error types for storage access and configuration.

/// Opaque failure reported by a storage backend (quota, disconnected
/// extension runtime, missing API). Only the rendered detail is kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct StorageFailure {
    detail: String,
}

impl StorageFailure {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }

    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Errors produced by the preference store and controller setup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThemeError {
    /// Reading the stored preference failed.
    #[error("storage read failed: {0}")]
    StorageRead(StorageFailure),

    /// Persisting the preference failed.
    #[error("storage write failed: {0}")]
    StorageWrite(StorageFailure),

    /// Configuration JSON could not be parsed.
    #[error("config parse failed: {0}")]
    Config(String),
}
