//! Contract tests: a plugin written only against the api crate.

use serde::{Deserialize, Serialize};
use snapqueue_plugin_api::{
    AccountInfo, ApplicationInfo, BatchEventArgs, BatchEventType, BatchInfo, Bytes, EventHandler,
    EventKind, HostTask, LogLevel, PictureEventType, PictureInfo, Plugin, PluginError, PluginHost,
    PluginResult, PluginSettings, Renderer, RenderingArgs, RenderingContentType, TemplateToken,
    TokenValues, TypedSettings,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StampSettings {
    #[serde(default)]
    suffix: String,
}

#[derive(Default)]
struct Stamp {
    settings: TypedSettings<StampSettings>,
}

impl Plugin for Stamp {
    fn initialize(&mut self, host: Arc<dyn PluginHost>) -> PluginResult<()> {
        host.log(LogLevel::Info, "stamp ready");
        Ok(())
    }

    fn settings(&mut self) -> Option<&mut dyn PluginSettings> {
        Some(self)
    }

    fn event_handler(&mut self) -> Option<&mut dyn EventHandler> {
        Some(self)
    }

    fn renderer(&mut self) -> Option<&mut dyn Renderer> {
        Some(self)
    }
}

impl PluginSettings for Stamp {
    fn initialize_settings(&mut self, serialized: Option<&str>) -> PluginResult<()> {
        self.settings.load(serialized)
    }

    fn serialized_settings(&self) -> PluginResult<String> {
        self.settings.save()
    }
}

// Only the defaults: every handler is a no-op.
impl EventHandler for Stamp {}

impl Renderer for Stamp {
    fn on_rendering_file(&mut self, _args: &RenderingArgs, stream: Bytes) -> PluginResult<Bytes> {
        let mut out = stream.to_vec();
        out.extend_from_slice(self.settings.get().suffix.as_bytes());
        Ok(Bytes::from(out))
    }
}

#[derive(Default)]
struct LogHost {
    lines: Mutex<Vec<String>>,
}

impl PluginHost for LogHost {
    fn log(&self, _level: LogLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(message.to_string());
        }
    }

    fn application_info(&self) -> ApplicationInfo {
        ApplicationInfo {
            name: "SnapQueue".to_string(),
            version: "0.1.0".to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    fn register_task(&self, _task: HostTask) {}
    fn enqueue_files(&self, _files: &[PathBuf]) {}
    fn upload_pictures(&self, _picture_ids: &[String]) {}
    fn upload_batch(&self, _batch_id: &str) {}

    fn edit_template(&self, _template: &str, _extra_tokens: &[TemplateToken]) -> Option<String> {
        None
    }

    fn substitute_tokens(&self, template: &str, _tokens: &TokenValues) -> String {
        template.to_string()
    }
}

#[test]
fn test_plugin_exposes_capabilities_through_accessors() {
    let host = Arc::new(LogHost::default());
    let mut plugin: Box<dyn Plugin> = Box::new(Stamp::default());
    plugin.initialize(host.clone()).unwrap();
    assert_eq!(*host.lines.lock().unwrap(), ["stamp ready"]);

    plugin
        .settings()
        .unwrap()
        .initialize_settings(Some(r#"{"suffix":"!"}"#))
        .unwrap();
    assert!(plugin.settings().unwrap().settings_editor().unwrap().is_none());

    let args = RenderingArgs {
        content_type: RenderingContentType::Picture,
        account: AccountInfo::default(),
        picture: PictureInfo::default(),
        tokens: TokenValues::new(),
    };
    let renderer = plugin.renderer().unwrap();
    let out = renderer.on_rendering_file(&args, Bytes::from_static(b"jpg")).unwrap();
    assert_eq!(out, Bytes::from_static(b"jpg!"));
    renderer.on_rendering_file_completed(&args).unwrap();

    let handler = plugin.event_handler().unwrap();
    handler
        .on_batch_event(&BatchEventArgs {
            event: BatchEventType::Uploaded,
            account: AccountInfo::default(),
            batch: BatchInfo::default(),
            tokens: TokenValues::new(),
        })
        .unwrap();

    plugin.dispose();
}

#[test]
fn test_invalid_settings_surface_as_settings_error() {
    let mut plugin = Stamp::default();
    let err = plugin.initialize_settings(Some("[1, 2")).unwrap_err();
    assert!(matches!(err, PluginError::Settings(_)));
    assert_eq!(plugin.serialized_settings().unwrap(), r#"{"suffix":""}"#);
}

#[test]
fn test_event_kinds_cover_every_taxonomy() {
    let taxonomies: std::collections::BTreeSet<&str> =
        EventKind::all().map(|kind| kind.taxonomy()).collect();
    assert_eq!(taxonomies.len(), 7);
    assert!(EventKind::all().any(|kind| kind == EventKind::Picture(PictureEventType::UploadFailed)));
}
