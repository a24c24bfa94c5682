//! Live plugin instances.
//!
//! A [`PluginInstance`] owns one constructed plugin object. Construction runs
//! through a fixed sequence of stages, each isolated so a failure is
//! attributed to the stage that caused it:
//!
//! 1. construct the plugin object from its descriptor
//! 2. initialize it with a host bound to this instance
//! 3. if it has settings, restore them and fetch its settings editor
//!
//! Disposal is explicit and happens at most once; dropping an instance that
//! was never disposed disposes it.

use crate::capability::TokenKind;
use crate::descriptor::PluginDescriptor;
use crate::error::{InstanceError, LifecycleStage};
use crate::host::{HostServices, InstanceHost};
use crate::isolation::{call_plugin, call_plugin_infallible};
use snapqueue_plugin_api::{Plugin, PluginError, PluginHost, SettingsEditor};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One live plugin object plus its enabled flag.
pub struct PluginInstance {
    id: String,
    collection_id: String,
    descriptor: Arc<PluginDescriptor>,
    plugin: Option<Box<dyn Plugin>>,
    enabled: bool,
    settings_editor: Option<Box<dyn SettingsEditor>>,
    host: Arc<InstanceHost>,
}

/// Inputs for building a [`PluginInstance`].
pub struct InstanceRequest<'a> {
    /// Id to reuse; a new one is generated when absent.
    pub id: Option<String>,
    pub collection_id: &'a str,
    pub token_kinds: Vec<TokenKind>,
    pub descriptor: Arc<PluginDescriptor>,
    pub services: Arc<dyn HostServices>,
    pub serialized_settings: Option<&'a str>,
    pub enabled: bool,
}

impl PluginInstance {
    /// Construct, host-initialize and settings-initialize a plugin.
    pub fn create(request: InstanceRequest<'_>) -> Result<Self, InstanceError> {
        let InstanceRequest {
            id,
            collection_id,
            token_kinds,
            descriptor,
            services,
            serialized_settings,
            enabled,
        } = request;

        let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let fail = |stage: LifecycleStage, source: PluginError| InstanceError {
            stage,
            plugin: descriptor.id().to_string(),
            instance: id.clone(),
            source,
        };

        debug!(plugin = %descriptor.id(), instance = %id, "Constructing plugin");
        let mut plugin = call_plugin(|| descriptor.instantiate())
            .map_err(|e| fail(LifecycleStage::Construction, e))?;

        let host = Arc::new(InstanceHost::new(
            services,
            descriptor.id(),
            id.clone(),
            token_kinds,
        ));

        debug!(plugin = %descriptor.id(), instance = %id, "Initializing plugin");
        let bound: Arc<dyn PluginHost> = host.clone();
        if let Err(e) = call_plugin(|| plugin.initialize(bound)) {
            dispose_quietly(plugin.as_mut());
            return Err(fail(LifecycleStage::HostInitialization, e));
        }

        let settings_editor = match initialize_settings(plugin.as_mut(), serialized_settings) {
            Ok(editor) => editor,
            Err((stage, e)) => {
                dispose_quietly(plugin.as_mut());
                return Err(fail(stage, e));
            }
        };

        Ok(Self {
            id,
            collection_id: collection_id.to_string(),
            descriptor,
            plugin: Some(plugin),
            enabled,
            settings_editor,
            host,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn descriptor(&self) -> &Arc<PluginDescriptor> {
        &self.descriptor
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Settings editor obtained during construction, if any.
    pub fn settings_editor(&self) -> Option<&dyn SettingsEditor> {
        self.settings_editor.as_deref()
    }

    /// The host facade bound to this instance.
    pub fn host(&self) -> &Arc<InstanceHost> {
        &self.host
    }

    pub fn is_disposed(&self) -> bool {
        self.plugin.is_none()
    }

    /// Live plugin object; `None` once disposed.
    pub(crate) fn plugin_mut(&mut self) -> Option<&mut (dyn Plugin + 'static)> {
        self.plugin.as_deref_mut()
    }

    /// Serialize the plugin's current settings.
    ///
    /// Plugins without settings (and disposed instances) yield an empty
    /// string.
    pub fn get_serialized_settings(&mut self) -> Result<String, InstanceError> {
        let Some(plugin) = self.plugin.as_mut() else {
            return Ok(String::new());
        };

        call_plugin(|| match plugin.settings() {
            Some(settings) => settings.serialized_settings(),
            None => Ok(String::new()),
        })
        .map_err(|source| InstanceError {
            stage: LifecycleStage::SettingsSerialization,
            plugin: self.descriptor.id().to_string(),
            instance: self.id.clone(),
            source,
        })
    }

    /// Release the live plugin object. Calling this again is a no-op.
    pub fn dispose(&mut self) {
        if let Some(mut plugin) = self.plugin.take() {
            self.settings_editor = None;
            debug!(plugin = %self.descriptor.id(), instance = %self.id, "Disposing plugin");
            dispose_quietly(plugin.as_mut());
        }
    }
}

impl Drop for PluginInstance {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("id", &self.id)
            .field("collection_id", &self.collection_id)
            .field("plugin", &self.descriptor.id())
            .field("enabled", &self.enabled)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

type SettingsOutcome = Result<Option<Box<dyn SettingsEditor>>, (LifecycleStage, PluginError)>;

fn initialize_settings(plugin: &mut dyn Plugin, serialized: Option<&str>) -> SettingsOutcome {
    let has_settings = call_plugin(|| Ok(plugin.settings().is_some()))
        .map_err(|e| (LifecycleStage::SettingsInitialization, e))?;
    if !has_settings {
        return Ok(None);
    }

    call_plugin(|| match plugin.settings() {
        Some(settings) => settings.initialize_settings(serialized),
        None => Ok(()),
    })
    .map_err(|e| (LifecycleStage::SettingsInitialization, e))?;

    call_plugin(|| match plugin.settings() {
        Some(settings) => settings.settings_editor(),
        None => Ok(None),
    })
    .map_err(|e| (LifecycleStage::SettingsEditor, e))
}

fn dispose_quietly(plugin: &mut dyn Plugin) {
    if !call_plugin_infallible(|| plugin.dispose()) {
        tracing::warn!("Plugin panicked while being disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PluginImplementation;
    use crate::host::NoopHostServices;
    use chrono::Utc;
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};
    use snapqueue_plugin_api::{ApplicationInfo, PluginResult, PluginSettings, TypedSettings};

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    enum FailAt {
        #[default]
        Nowhere,
        Initialize,
        Settings,
        Editor,
        Serialize,
        SerializePanic,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Counter {
        count: u32,
    }

    struct Editor;

    impl SettingsEditor for Editor {
        fn title(&self) -> &str {
            "Counter"
        }
    }

    struct Gauge {
        fail_at: FailAt,
        settings: TypedSettings<Counter>,
        disposals: Arc<Mutex<u32>>,
    }

    impl Plugin for Gauge {
        fn initialize(&mut self, _host: Arc<dyn PluginHost>) -> PluginResult<()> {
            if self.fail_at == FailAt::Initialize {
                return Err(PluginError::failed("no host for you"));
            }
            Ok(())
        }

        fn dispose(&mut self) {
            *self.disposals.lock() += 1;
        }

        fn settings(&mut self) -> Option<&mut dyn PluginSettings> {
            Some(self)
        }
    }

    impl PluginSettings for Gauge {
        fn initialize_settings(&mut self, serialized: Option<&str>) -> PluginResult<()> {
            if self.fail_at == FailAt::Settings {
                panic!("corrupt settings");
            }
            self.settings.load(serialized)
        }

        fn serialized_settings(&self) -> PluginResult<String> {
            match self.fail_at {
                FailAt::Serialize => Err(PluginError::Settings("counter overflowed".to_string())),
                FailAt::SerializePanic => panic!("settings vanished"),
                _ => self.settings.save(),
            }
        }

        fn settings_editor(&mut self) -> PluginResult<Option<Box<dyn SettingsEditor>>> {
            if self.fail_at == FailAt::Editor {
                return Err(PluginError::failed("no editor"));
            }
            Ok(Some(Box::new(Editor)))
        }
    }

    fn descriptor(fail_at: FailAt, disposals: Arc<Mutex<u32>>) -> Arc<PluginDescriptor> {
        let implementation = PluginImplementation::new(
            "[plugin]\nid = \"acme.gauge\"\nname = \"Gauge\"\npurpose = \"Measuring\"\n",
            move || {
                Ok(Box::new(Gauge {
                    fail_at,
                    settings: TypedSettings::default(),
                    disposals: Arc::clone(&disposals),
                }) as Box<dyn Plugin>)
            },
        );
        Arc::new(PluginDescriptor::from_implementation(&implementation).unwrap())
    }

    fn request(descriptor: Arc<PluginDescriptor>, settings: Option<&str>) -> InstanceRequest<'_> {
        InstanceRequest {
            id: None,
            collection_id: "application:initialized",
            token_kinds: vec![TokenKind::Application],
            descriptor,
            services: Arc::new(NoopHostServices::new(ApplicationInfo {
                name: "test".to_string(),
                version: "0.0.0".to_string(),
                started_at: Utc::now(),
            })),
            serialized_settings: settings,
            enabled: true,
        }
    }

    #[test]
    fn test_create_restores_settings_and_editor() {
        let disposals = Arc::new(Mutex::new(0));
        let mut instance = PluginInstance::create(request(
            descriptor(FailAt::Nowhere, disposals.clone()),
            Some(r#"{"count":7}"#),
        ))
        .unwrap();

        assert!(!instance.id().is_empty());
        assert_eq!(instance.host().instance_id(), instance.id());
        assert_eq!(instance.settings_editor().map(|e| e.title()), Some("Counter"));
        assert_eq!(instance.get_serialized_settings().unwrap(), r#"{"count":7}"#);
    }

    #[test]
    fn test_empty_settings_yield_defaults() {
        let mut instance = PluginInstance::create(request(
            descriptor(FailAt::Nowhere, Arc::new(Mutex::new(0))),
            None,
        ))
        .unwrap();
        assert_eq!(instance.get_serialized_settings().unwrap(), r#"{"count":0}"#);
    }

    #[test]
    fn test_stage_failures_are_attributed() {
        let cases = [
            (FailAt::Initialize, LifecycleStage::HostInitialization, "InitializationError"),
            (FailAt::Settings, LifecycleStage::SettingsInitialization, "SettingsError"),
            (FailAt::Editor, LifecycleStage::SettingsEditor, "SettingsError"),
        ];

        for (fail_at, stage, category) in cases {
            let disposals = Arc::new(Mutex::new(0));
            let err = PluginInstance::create(request(descriptor(fail_at, disposals.clone()), None))
                .unwrap_err();
            assert_eq!(err.stage, stage);
            assert_eq!(err.plugin, "acme.gauge");
            assert!(err.to_string().starts_with(category));
            assert_eq!(*disposals.lock(), 1, "partially built plugin is disposed");
        }
    }

    #[test]
    fn test_construction_failure() {
        let implementation = PluginImplementation::new(
            "[plugin]\nid = \"acme.broken\"\nname = \"Broken\"\npurpose = \"Breaking\"\n",
            || Err(PluginError::failed("missing dependency")),
        );
        let descriptor = Arc::new(PluginDescriptor::from_implementation(&implementation).unwrap());

        let err = PluginInstance::create(request(descriptor, None)).unwrap_err();
        assert_eq!(err.stage, LifecycleStage::Construction);
        assert!(err.to_string().contains("ConstructionError"));
        assert!(err.to_string().contains("missing dependency"));
    }

    #[test]
    fn test_dispose_runs_once() {
        let disposals = Arc::new(Mutex::new(0));
        let mut instance =
            PluginInstance::create(request(descriptor(FailAt::Nowhere, disposals.clone()), None))
                .unwrap();

        instance.dispose();
        instance.dispose();
        assert!(instance.is_disposed());
        assert!(instance.settings_editor().is_none());
        assert_eq!(instance.get_serialized_settings().unwrap(), "");
        drop(instance);
        assert_eq!(*disposals.lock(), 1);
    }

    #[test]
    fn test_drop_disposes() {
        let disposals = Arc::new(Mutex::new(0));
        let instance =
            PluginInstance::create(request(descriptor(FailAt::Nowhere, disposals.clone()), None))
                .unwrap();
        drop(instance);
        assert_eq!(*disposals.lock(), 1);
    }

    #[test]
    fn test_serialization_failures_are_attributed() {
        for (fail_at, cause) in [
            (FailAt::Serialize, "counter overflowed"),
            (FailAt::SerializePanic, "settings vanished"),
        ] {
            let disposals = Arc::new(Mutex::new(0));
            let mut instance =
                PluginInstance::create(request(descriptor(fail_at, disposals.clone()), None))
                    .unwrap();

            let err = instance.get_serialized_settings().unwrap_err();
            assert_eq!(err.stage, LifecycleStage::SettingsSerialization);
            assert_eq!(err.instance, instance.id());
            assert!(err.to_string().starts_with("SettingsError"));
            assert!(err.to_string().contains(cause));

            // The instance stays usable after a failed save.
            assert!(!instance.is_disposed());
            assert_eq!(*disposals.lock(), 0);
        }
    }
}
