//! Error types returned by plugin code.

use thiserror::Error;

/// Errors a plugin can report back to the runtime.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The plugin could not complete the requested operation.
    #[error("{0}")]
    Failed(String),

    /// Settings could not be read, applied or produced.
    #[error("Settings error: {0}")]
    Settings(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The plugin panicked; the payload message is preserved.
    #[error("Plugin panicked: {0}")]
    Panicked(String),
}

impl PluginError {
    /// Shorthand for [`PluginError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        PluginError::Failed(message.into())
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = std::result::Result<T, PluginError>;
