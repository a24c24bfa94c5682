//! Configuration file loading and management
//!
//! This module handles loading and saving the application configuration at
//! `$XDG_CONFIG_HOME/snapqueue/config.toml`. Application-scoped plugin
//! instances are persisted in `[[plugins]]`, account-scoped ones under each
//! `[[accounts]]` entry. If the file doesn't exist, a default configuration
//! is created with documented comments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use snapqueue_plugin_api::AccountInfo;
use snapqueue_plugin_runtime::PluginConfiguration;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Application-wide settings
    #[serde(default)]
    pub app: AppConfig,
    /// Application-scoped plugin instances
    #[serde(default)]
    pub plugins: Vec<PluginConfiguration>,
    /// Configured upload accounts
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Display name
    /// Default: "SnapQueue"
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    /// Default: "info"
    pub log_level: String,
}

/// One upload account and its account-scoped plugin instances
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub plugins: Vec<PluginConfiguration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "SnapQueue".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AccountConfig {
    pub fn info(&self) -> AccountInfo {
        AccountInfo {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from the specified path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default XDG config location
    ///
    /// If the configuration file doesn't exist, creates a default configuration
    /// file with documented comments.
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_file(&config_path)?;
        }

        Self::load(&config_path)
    }

    /// Get the default configuration file path
    ///
    /// Returns `$XDG_CONFIG_HOME/snapqueue/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "snapqueue", "snapqueue")
            .context("Failed to determine project directories")?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Write the configuration, replacing the file at `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Create a default configuration file with documented comments
    fn create_default_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write default config file: {}", path.display()))?;

        tracing::info!("Created default configuration file at: {}", path.display());
        Ok(())
    }

    /// Generate the default configuration file content with comments
    fn default_config_content() -> String {
        r#"# SnapQueue Configuration

[app]
# Display name shown to plugins
name = "SnapQueue"

# Log level: trace, debug, info, warn, error
# RUST_LOG overrides this when set
log_level = "info"

# Application-scoped plugin instances.
# collectionId is "<taxonomy>:<event>", e.g. "application:initialized".
[[plugins]]
id = "activity-log-startup"
isEnabled = true
settings = ""
collectionId = "application:initialized"
pluginTypeId = "snapqueue.builtin.activity-log"

# Upload accounts. Account-scoped plugin instances (account, batch and
# picture events, and the "rendering" chain) live under each account.
# [[accounts]]
# id = "main"
# name = "My photos"
#
# [[accounts.plugins]]
# id = "auto-upload-main"
# isEnabled = true
# settings = '{"upload_on_add":true,"title_template":"{FileName}"}'
# collectionId = "picture:added"
# pluginTypeId = "snapqueue.builtin.auto-upload"
"#
        .to_string()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.app.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log_level: {}. Must be one of: {}",
                self.app.log_level,
                VALID_LOG_LEVELS.join(", ")
            );
        }

        let mut account_ids = HashSet::new();
        for account in &self.accounts {
            if account.id.trim().is_empty() {
                anyhow::bail!("Account '{}': id cannot be empty", account.name);
            }
            if !account_ids.insert(account.id.as_str()) {
                anyhow::bail!("Duplicate account id: {}", account.id);
            }
        }

        let all_plugins = self
            .plugins
            .iter()
            .chain(self.accounts.iter().flat_map(|a| a.plugins.iter()));
        for plugin in all_plugins {
            if plugin.id.trim().is_empty() || plugin.plugin_type_id.trim().is_empty() {
                anyhow::bail!(
                    "Plugin entry in '{}' needs both id and pluginTypeId",
                    plugin.collection_id
                );
            }
        }

        Ok(())
    }
}
