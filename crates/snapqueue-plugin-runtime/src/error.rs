//! Error types for the plugin runtime.

use crate::descriptor::InstantiationPolicy;
use snapqueue_plugin_api::PluginError;
use std::fmt;
use thiserror::Error;

/// Errors that can occur in the plugin runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// One implementation's descriptor could not be built.
    #[error("Discovery error for {implementation}: {reason}")]
    Discovery {
        implementation: String,
        reason: String,
    },

    /// Failed to parse or validate a plugin manifest.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Adding the instance would violate the descriptor's instantiation policy.
    #[error("Plugin '{plugin}' cannot be added to '{collection}': policy is {policy}")]
    PolicyViolation {
        plugin: String,
        collection: String,
        policy: InstantiationPolicy,
    },

    /// A lifecycle stage of one instance failed.
    #[error(transparent)]
    Instance(#[from] InstanceError),

    /// No collection with this id.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// No descriptor with this id.
    #[error("Plugin type not found: {0}")]
    DescriptorNotFound(String),

    /// The instance is not a member of the collection.
    #[error("Instance {instance} is not a member of collection {collection}")]
    InstanceNotFound { instance: String, collection: String },

    /// Another live instance already uses this instance id.
    #[error("Instance id {instance} is already in use (adding to {collection})")]
    DuplicateInstance { instance: String, collection: String },

    /// The descriptor is not eligible for membership in the collection.
    #[error("Plugin '{plugin}' does not support collection '{collection}'")]
    NotEligible { plugin: String, collection: String },

    /// A live plugin failed during an invoked capability call.
    #[error("Plugin instance {instance} in {collection} failed: {source}")]
    Dispatch {
        instance: String,
        collection: String,
        #[source]
        source: PluginError,
    },

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

/// Stage of the instance lifecycle that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Construction,
    HostInitialization,
    SettingsInitialization,
    SettingsEditor,
    SettingsSerialization,
}

impl LifecycleStage {
    /// Error category this stage reports under.
    pub fn category(&self) -> &'static str {
        match self {
            LifecycleStage::Construction => "ConstructionError",
            LifecycleStage::HostInitialization => "InitializationError",
            LifecycleStage::SettingsInitialization
            | LifecycleStage::SettingsEditor
            | LifecycleStage::SettingsSerialization => "SettingsError",
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleStage::Construction => "construction",
            LifecycleStage::HostInitialization => "host initialization",
            LifecycleStage::SettingsInitialization => "settings initialization",
            LifecycleStage::SettingsEditor => "settings editor",
            LifecycleStage::SettingsSerialization => "settings serialization",
        };
        f.write_str(name)
    }
}

/// A lifecycle stage of one plugin instance failed.
#[derive(Error, Debug)]
#[error("{}: {stage} of plugin '{plugin}' (instance {instance}) failed: {source}", .stage.category())]
pub struct InstanceError {
    pub stage: LifecycleStage,
    pub plugin: String,
    pub instance: String,
    #[source]
    pub source: PluginError,
}
