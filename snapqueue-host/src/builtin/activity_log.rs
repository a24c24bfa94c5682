//! Activity log: writes application, configuration, account and picture
//! events to the host log.

use serde::{Deserialize, Serialize};
use snapqueue_plugin_api::{
    AccountEventArgs, ApplicationEventArgs, ApplicationEventType, ConfigurationEventArgs,
    EventHandler, HostTask, LogLevel, PictureEventArgs, Plugin, PluginError, PluginHost,
    PluginResult, PluginSettings, SettingsEditor, TokenValues, TypedSettings,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const ID: &str = "snapqueue.builtin.activity-log";

pub const MANIFEST: &str = r#"
[plugin]
id = "snapqueue.builtin.activity-log"
name = "Activity Log"
purpose = "Logs application, account and picture activity"
description = "Writes one log line per event. With verbose on, the event's template tokens are logged too."
author = "SnapQueue"
version = "1.0.0"
instantiation = "multiple_per_scope"

[supports]
application = ["initialized", "activated", "deactivated", "closing"]
configuration = ["loaded", "saving", "saved"]
account = ["activated", "deactivated", "settings_changed"]
picture = ["added", "removed", "uploaded", "upload_failed"]
"#;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogSettings {
    #[serde(default)]
    pub verbose: bool,
}

struct ActivityLogEditor;

impl SettingsEditor for ActivityLogEditor {
    fn title(&self) -> &str {
        "Activity Log"
    }
}

#[derive(Default)]
pub struct ActivityLog {
    host: Option<Arc<dyn PluginHost>>,
    settings: TypedSettings<ActivityLogSettings>,
    events: Arc<AtomicU64>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn host(&self) -> PluginResult<&Arc<dyn PluginHost>> {
        self.host
            .as_ref()
            .ok_or_else(|| PluginError::failed("activity log used before initialization"))
    }

    fn write(&self, line: String, tokens: &TokenValues) -> PluginResult<()> {
        let host = self.host()?;
        self.events.fetch_add(1, Ordering::Relaxed);
        if self.settings.get().verbose && !tokens.is_empty() {
            host.log(LogLevel::Info, &format!("{line} {tokens:?}"));
        } else {
            host.log(LogLevel::Info, &line);
        }
        Ok(())
    }
}

impl Plugin for ActivityLog {
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

impl PluginSettings for ActivityLog {
    fn initialize_settings(&mut self, serialized: Option<&str>) -> PluginResult<()> {
        self.settings.load(serialized)
    }

    fn serialized_settings(&self) -> PluginResult<String> {
        self.settings.save()
    }

    fn settings_editor(&mut self) -> PluginResult<Option<Box<dyn SettingsEditor>>> {
        Ok(Some(Box::new(ActivityLogEditor)))
    }
}

impl EventHandler for ActivityLog {
    fn on_application_event(&mut self, args: &ApplicationEventArgs) -> PluginResult<()> {
        self.write(
            format!("Application {} ({})", args.event, args.application.name),
            &args.tokens,
        )?;

        // Summarize off the dispatch thread once the application is closing.
        if args.event == ApplicationEventType::Closing {
            let host = Arc::clone(self.host()?);
            let events = Arc::clone(&self.events);
            self.host()?.register_task(HostTask::new("Summarize activity", move || {
                host.log(
                    LogLevel::Info,
                    &format!("Activity log saw {} events", events.load(Ordering::Relaxed)),
                );
                Ok(())
            }));
        }
        Ok(())
    }

    fn on_configuration_event(&mut self, args: &ConfigurationEventArgs) -> PluginResult<()> {
        self.write(format!("Configuration {}", args.event), &args.tokens)
    }

    fn on_account_event(&mut self, args: &AccountEventArgs) -> PluginResult<()> {
        self.write(
            format!("Account '{}' {}", args.account.name, args.event),
            &args.tokens,
        )
    }

    fn on_picture_event(&mut self, args: &PictureEventArgs) -> PluginResult<()> {
        self.write(
            format!(
                "Picture '{}' {} for account '{}'",
                args.picture.file_name, args.event, args.account.name
            ),
            &args.tokens,
        )
    }
}
