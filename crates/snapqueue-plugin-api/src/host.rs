//! Host functions exposed to plugins.
//!
//! Plugins receive an `Arc<dyn PluginHost>` during initialization and use it
//! for everything they need from the application. The host never hands out
//! anything broader than this surface.

use crate::error::PluginResult;
use crate::events::{ApplicationInfo, TokenValues};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Host functions available to plugins.
pub trait PluginHost: Send + Sync {
    /// Log a message (always allowed).
    fn log(&self, level: LogLevel, message: &str);

    /// Static information about the running application.
    fn application_info(&self) -> ApplicationInfo;

    /// Hand a long-running task to the host's task list.
    fn register_task(&self, task: HostTask);

    /// Add files to the upload queue of the active account.
    fn enqueue_files(&self, files: &[PathBuf]);

    /// Upload the given queued pictures now.
    fn upload_pictures(&self, picture_ids: &[String]);

    /// Upload a whole batch now.
    fn upload_batch(&self, batch_id: &str);

    /// Present a template editor pre-populated with the tokens the plugin's
    /// collection supplies plus `extra_tokens`. Returns the edited template,
    /// or `None` if the user cancelled.
    fn edit_template(&self, template: &str, extra_tokens: &[TemplateToken]) -> Option<String>;

    /// Substitute token values into a template string.
    fn substitute_tokens(&self, template: &str, tokens: &TokenValues) -> String;
}

/// Log level for plugin logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// A token a template may reference, e.g. `{Title}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateToken {
    pub name: String,
    pub description: String,
}

impl TemplateToken {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A long-running unit of work registered with the host.
pub struct HostTask {
    /// Name shown in the host's task list.
    pub name: String,

    /// Work to run off the dispatch thread.
    pub work: Box<dyn FnOnce() -> PluginResult<()> + Send>,
}

impl HostTask {
    pub fn new<F>(name: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> PluginResult<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            work: Box::new(work),
        }
    }
}

impl fmt::Debug for HostTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostTask").field("name", &self.name).finish()
    }
}
