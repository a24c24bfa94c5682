//! Auto upload: uploads pictures as soon as they are added to the queue.

use serde::{Deserialize, Serialize};
use snapqueue_plugin_api::{
    EventHandler, LogLevel, PictureEventArgs, PictureEventType, Plugin, PluginError, PluginHost,
    PluginResult, PluginSettings, SettingsEditor, TemplateToken, TypedSettings,
};
use std::sync::Arc;

pub const ID: &str = "snapqueue.builtin.auto-upload";

pub const MANIFEST: &str = r#"
[plugin]
id = "snapqueue.builtin.auto-upload"
name = "Auto Upload"
purpose = "Uploads pictures as soon as they are queued"
description = "Requests an upload for every picture added to an account's queue and logs it under a templated title."
author = "SnapQueue"
version = "1.0.0"
instantiation = "single_per_scope"

[supports]
picture = ["added"]
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoUploadSettings {
    #[serde(default = "default_upload_on_add")]
    pub upload_on_add: bool,
    #[serde(default = "default_title_template")]
    pub title_template: String,
}

fn default_upload_on_add() -> bool {
    true
}

fn default_title_template() -> String {
    "{FileName}".to_string()
}

impl Default for AutoUploadSettings {
    fn default() -> Self {
        Self {
            upload_on_add: default_upload_on_add(),
            title_template: default_title_template(),
        }
    }
}

/// Editor handle for the title template.
struct TitleTemplateEditor {
    title: String,
}

impl SettingsEditor for TitleTemplateEditor {
    fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Default)]
pub struct AutoUpload {
    host: Option<Arc<dyn PluginHost>>,
    settings: TypedSettings<AutoUploadSettings>,
}

impl AutoUpload {
    pub fn new() -> Self {
        Self::default()
    }

    fn host(&self) -> PluginResult<&Arc<dyn PluginHost>> {
        self.host
            .as_ref()
            .ok_or_else(|| PluginError::failed("auto upload used before initialization"))
    }
}

impl Plugin for AutoUpload {
    fn initialize(&mut self, host: Arc<dyn PluginHost>) -> PluginResult<()> {
        self.host = Some(host);
        Ok(())
    }

    fn dispose(&mut self) {
        self.host = None;
    }

    fn settings(&mut self) -> Option<&mut dyn PluginSettings> {
        Some(self)
    }

    fn event_handler(&mut self) -> Option<&mut dyn EventHandler> {
        Some(self)
    }
}

impl PluginSettings for AutoUpload {
    fn initialize_settings(&mut self, serialized: Option<&str>) -> PluginResult<()> {
        self.settings.load(serialized)
    }

    fn serialized_settings(&self) -> PluginResult<String> {
        self.settings.save()
    }

    /// Checks the stored title template against the tokens the host can
    /// supply; a template the host rejects falls back to the default.
    fn settings_editor(&mut self) -> PluginResult<Option<Box<dyn SettingsEditor>>> {
        let host = Arc::clone(self.host()?);
        let extra = [TemplateToken::new("Counter", "Position in the upload queue")];
        let template = self.settings.get().title_template.clone();

        if host.edit_template(&template, &extra).is_none() {
            host.log(
                LogLevel::Warn,
                &format!("Title template '{template}' uses unknown tokens; using default"),
            );
            self.settings.get_mut().title_template = default_title_template();
        }

        Ok(Some(Box::new(TitleTemplateEditor {
            title: "Auto Upload title".to_string(),
        })))
    }
}

impl EventHandler for AutoUpload {
    fn on_picture_event(&mut self, args: &PictureEventArgs) -> PluginResult<()> {
        if args.event != PictureEventType::Added || !self.settings.get().upload_on_add {
            return Ok(());
        }

        let host = self.host()?;
        let title = host.substitute_tokens(&self.settings.get().title_template, &args.tokens);
        host.log(
            LogLevel::Info,
            &format!("Uploading '{title}' to '{}'", args.account.name),
        );
        host.upload_pictures(std::slice::from_ref(&args.picture.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::testing::RecordingHost;
    use snapqueue_plugin_api::{AccountInfo, PictureInfo, TokenValues};

    fn added(picture_id: &str) -> PictureEventArgs {
        let mut tokens = TokenValues::new();
        tokens.insert("FileName".to_string(), "beach.jpg".to_string());
        PictureEventArgs {
            event: PictureEventType::Added,
            account: AccountInfo {
                id: "a1".to_string(),
                name: "Main".to_string(),
            },
            picture: PictureInfo {
                id: picture_id.to_string(),
                ..Default::default()
            },
            tokens,
        }
    }

    #[test]
    fn test_uploads_added_pictures() {
        let host = Arc::new(RecordingHost::default());
        let mut plugin = AutoUpload::new();
        plugin.initialize(host.clone()).unwrap();
        plugin.initialize_settings(None).unwrap();

        plugin.on_picture_event(&added("p1")).unwrap();

        assert_eq!(host.uploads(), vec![vec!["p1".to_string()]]);
        assert_eq!(host.logs(), vec!["Uploading 'beach.jpg' to 'Main'".to_string()]);
    }

    #[test]
    fn test_upload_can_be_switched_off() {
        let host = Arc::new(RecordingHost::default());
        let mut plugin = AutoUpload::new();
        plugin.initialize(host.clone()).unwrap();
        plugin
            .initialize_settings(Some(r#"{"upload_on_add":false}"#))
            .unwrap();

        plugin.on_picture_event(&added("p1")).unwrap();
        assert!(host.uploads().is_empty());
        assert_eq!(plugin.settings.get().title_template, "{FileName}");
    }

    #[test]
    fn test_editor_resets_unknown_template() {
        let host = Arc::new(RecordingHost::default());
        let mut plugin = AutoUpload::new();
        plugin.initialize(host.clone()).unwrap();
        plugin
            .initialize_settings(Some(r#"{"upload_on_add":true,"title_template":"{Nope}"}"#))
            .unwrap();

        let editor = plugin.settings_editor().unwrap().unwrap();
        assert_eq!(editor.title(), "Auto Upload title");
        assert_eq!(plugin.settings.get().title_template, "{FileName}");
    }
}
