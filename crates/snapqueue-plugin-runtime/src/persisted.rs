//! The durable record of one plugin instance.

use serde::{Deserialize, Serialize};

/// Flat record persisted per instance in application or account
/// configuration. Instances are rebuilt from it at load time and flattened
/// back into it at save time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfiguration {
    /// Instance id, stable across save/load cycles.
    pub id: String,

    #[serde(default = "default_enabled")]
    pub is_enabled: bool,

    /// Opaque serialized settings; empty means defaults.
    #[serde(default)]
    pub settings: String,

    pub collection_id: String,

    /// Descriptor id of the plugin implementation.
    pub plugin_type_id: String,
}

fn default_enabled() -> bool {
    true
}

impl PluginConfiguration {
    pub fn new(
        id: impl Into<String>,
        collection_id: impl Into<String>,
        plugin_type_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            is_enabled: true,
            settings: String::new(),
            collection_id: collection_id.into(),
            plugin_type_id: plugin_type_id.into(),
        }
    }

    pub fn with_settings(mut self, settings: impl Into<String>) -> Self {
        self.settings = settings.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.is_enabled = enabled;
        self
    }
}
