//! Plugins shipped with SnapQueue.

pub mod activity_log;
pub mod auto_upload;
pub mod render_audit;

use snapqueue_plugin_api::Plugin;
use snapqueue_plugin_runtime::{PluginCatalog, PluginImplementation};

/// Registration table of the built-in plugins.
pub fn builtin_catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with(
            "activity_log::ActivityLog",
            PluginImplementation::new(activity_log::MANIFEST, || {
                Ok(Box::new(activity_log::ActivityLog::new()) as Box<dyn Plugin>)
            }),
        )
        .with(
            "auto_upload::AutoUpload",
            PluginImplementation::new(auto_upload::MANIFEST, || {
                Ok(Box::new(auto_upload::AutoUpload::new()) as Box<dyn Plugin>)
            }),
        )
        .with(
            "render_audit::RenderAudit",
            PluginImplementation::new(render_audit::MANIFEST, || {
                Ok(Box::new(render_audit::RenderAudit::new()) as Box<dyn Plugin>)
            }),
        )
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::template;
    use chrono::Utc;
    use parking_lot::Mutex;
    use snapqueue_plugin_api::{
        ApplicationInfo, HostTask, LogLevel, PluginHost, TemplateToken, TokenValues,
    };
    use std::path::PathBuf;

    /// Host that records what plugins ask of it.
    #[derive(Default)]
    pub struct RecordingHost {
        logs: Mutex<Vec<String>>,
        tasks: Mutex<Vec<HostTask>>,
        uploads: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingHost {
        pub fn logs(&self) -> Vec<String> {
            self.logs.lock().clone()
        }

        pub fn uploads(&self) -> Vec<Vec<String>> {
            self.uploads.lock().clone()
        }

        pub fn take_tasks(&self) -> Vec<HostTask> {
            std::mem::take(&mut *self.tasks.lock())
        }
    }

    impl PluginHost for RecordingHost {
        fn log(&self, _level: LogLevel, message: &str) {
            self.logs.lock().push(message.to_string());
        }

        fn application_info(&self) -> ApplicationInfo {
            ApplicationInfo {
                name: "SnapQueue".to_string(),
                version: "0.1.0".to_string(),
                started_at: Utc::now(),
            }
        }

        fn register_task(&self, task: HostTask) {
            self.tasks.lock().push(task);
        }

        fn enqueue_files(&self, _files: &[PathBuf]) {}

        fn upload_pictures(&self, picture_ids: &[String]) {
            self.uploads.lock().push(picture_ids.to_vec());
        }

        fn upload_batch(&self, _batch_id: &str) {}

        fn edit_template(&self, template: &str, extra_tokens: &[TemplateToken]) -> Option<String> {
            let known = ["FileName", "Title", "AccountName"];
            template::referenced_tokens(template)
                .iter()
                .all(|name| known.contains(name) || extra_tokens.iter().any(|t| t.name == *name))
                .then(|| template.to_string())
        }

        fn substitute_tokens(&self, template: &str, tokens: &TokenValues) -> String {
            template::substitute(template, tokens)
        }
    }
}
