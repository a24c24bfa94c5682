//! Typed plugin settings persisted as opaque strings.
//!
//! The runtime only ever sees the serialized form. Plugins keep a
//! [`TypedSettings`] and forward the [`PluginSettings`] calls to it.

use crate::error::{PluginError, PluginResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Settings capability of a plugin.
pub trait PluginSettings {
    /// Restore settings from their serialized form. `None` or an empty
    /// string means "use defaults".
    fn initialize_settings(&mut self, serialized: Option<&str>) -> PluginResult<()>;

    /// Serialize the current settings.
    fn serialized_settings(&self) -> PluginResult<String>;

    /// Obtain an editor for the current settings, if the plugin offers one.
    fn settings_editor(&mut self) -> PluginResult<Option<Box<dyn SettingsEditor>>> {
        Ok(None)
    }
}

/// Opaque handle to a settings editing surface owned by a plugin.
pub trait SettingsEditor: Send {
    /// Title of the editor surface.
    fn title(&self) -> &str;
}

/// JSON-backed settings value with default fallback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedSettings<S> {
    value: S,
}

impl<S> TypedSettings<S>
where
    S: Serialize + DeserializeOwned + Default,
{
    pub fn new(value: S) -> Self {
        Self { value }
    }

    /// Replace the value with the deserialized form of `serialized`.
    pub fn load(&mut self, serialized: Option<&str>) -> PluginResult<()> {
        self.value = match serialized.map(str::trim) {
            None | Some("") => S::default(),
            Some(text) => serde_json::from_str(text)
                .map_err(|e| PluginError::Settings(format!("cannot read settings: {e}")))?,
        };
        Ok(())
    }

    /// Serialize the current value.
    pub fn save(&self) -> PluginResult<String> {
        Ok(serde_json::to_string(&self.value)?)
    }

    pub fn get(&self) -> &S {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        enabled: bool,
        label: String,
    }

    #[test]
    fn test_empty_yields_default() {
        let mut settings = TypedSettings::new(Sample {
            enabled: true,
            label: "x".to_string(),
        });
        settings.load(Some("  ")).unwrap();
        assert_eq!(settings.get(), &Sample::default());

        settings.get_mut().enabled = true;
        settings.load(None).unwrap();
        assert!(!settings.get().enabled);
    }

    #[test]
    fn test_round_trip() {
        let mut settings = TypedSettings::<Sample>::default();
        settings.get_mut().label = "watermark".to_string();
        let saved = settings.save().unwrap();

        let mut restored = TypedSettings::<Sample>::default();
        restored.load(Some(&saved)).unwrap();
        assert_eq!(restored.get().label, "watermark");
        assert_eq!(restored.save().unwrap(), saved);
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = TypedSettings::<Sample>::default();
        let err = settings.load(Some("{not json")).unwrap_err();
        assert!(matches!(err, PluginError::Settings(_)));
    }
}
