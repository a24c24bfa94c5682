//! Host binding for plugin instances.
//!
//! [`HostServices`] is implemented by the integrating application and carries
//! the business logic this runtime does not own: the upload queue, the task
//! list, the template editor and token substitution. [`InstanceHost`] wraps
//! those services into the narrow [`PluginHost`] facade handed to one plugin
//! instance.

use crate::capability::TokenKind;
use snapqueue_plugin_api::{
    ApplicationInfo, EventPayload, HostTask, LogLevel, PluginHost, TemplateToken, TokenValues,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Application collaborators the host facade delegates to.
pub trait HostServices: Send + Sync {
    /// Static information about the running application.
    fn application_info(&self) -> ApplicationInfo;

    /// Add a long-running task to the host's task list.
    fn register_task(&self, task: HostTask);

    /// Add files to the upload queue of the active account.
    fn enqueue_files(&self, files: &[PathBuf]);

    /// Upload the given queued pictures now.
    fn upload_pictures(&self, picture_ids: &[String]);

    /// Upload a whole batch now.
    fn upload_batch(&self, batch_id: &str);

    /// Present the template editor with the given tokens.
    fn edit_template(
        &self,
        template: &str,
        token_kinds: &[TokenKind],
        extra_tokens: &[TemplateToken],
    ) -> Option<String>;

    /// Substitute token values into a template string.
    fn substitute_tokens(&self, template: &str, tokens: &TokenValues) -> String;

    /// Fill `tokens` from an event payload before it is dispatched.
    fn populate_tokens(&self, payload: EventPayload<'_>, tokens: &mut TokenValues);

    /// Surface a non-fatal status message to the user.
    fn notify_status(&self, message: &str);
}

/// Host services that do nothing, for headless use and tests.
#[derive(Debug, Clone)]
pub struct NoopHostServices {
    info: ApplicationInfo,
}

impl NoopHostServices {
    pub fn new(info: ApplicationInfo) -> Self {
        Self { info }
    }
}

impl HostServices for NoopHostServices {
    fn application_info(&self) -> ApplicationInfo {
        self.info.clone()
    }

    fn register_task(&self, task: HostTask) {
        tracing::debug!(task = %task.name, "Dropping task registered without a task list");
    }

    fn enqueue_files(&self, _files: &[PathBuf]) {}

    fn upload_pictures(&self, _picture_ids: &[String]) {}

    fn upload_batch(&self, _batch_id: &str) {}

    fn edit_template(
        &self,
        _template: &str,
        _token_kinds: &[TokenKind],
        _extra_tokens: &[TemplateToken],
    ) -> Option<String> {
        None
    }

    fn substitute_tokens(&self, template: &str, _tokens: &TokenValues) -> String {
        template.to_string()
    }

    fn populate_tokens(&self, _payload: EventPayload<'_>, _tokens: &mut TokenValues) {}

    fn notify_status(&self, _message: &str) {}
}

/// The [`PluginHost`] handed to one plugin instance.
pub struct InstanceHost {
    services: Arc<dyn HostServices>,
    plugin_id: String,
    instance_id: String,
    token_kinds: Vec<TokenKind>,
}

impl InstanceHost {
    pub fn new(
        services: Arc<dyn HostServices>,
        plugin_id: impl Into<String>,
        instance_id: impl Into<String>,
        token_kinds: Vec<TokenKind>,
    ) -> Self {
        Self {
            services,
            plugin_id: plugin_id.into(),
            instance_id: instance_id.into(),
            token_kinds,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

impl PluginHost for InstanceHost {
    fn log(&self, level: LogLevel, message: &str) {
        let plugin = self.plugin_id.as_str();
        let instance = self.instance_id.as_str();
        match level {
            LogLevel::Trace => tracing::trace!(plugin, instance, "{}", message),
            LogLevel::Debug => tracing::debug!(plugin, instance, "{}", message),
            LogLevel::Info => tracing::info!(plugin, instance, "{}", message),
            LogLevel::Warn => tracing::warn!(plugin, instance, "{}", message),
            LogLevel::Error => tracing::error!(plugin, instance, "{}", message),
        }
    }

    fn application_info(&self) -> ApplicationInfo {
        self.services.application_info()
    }

    fn register_task(&self, task: HostTask) {
        tracing::debug!(plugin = %self.plugin_id, task = %task.name, "Registering task");
        self.services.register_task(task);
    }

    fn enqueue_files(&self, files: &[PathBuf]) {
        self.services.enqueue_files(files);
    }

    fn upload_pictures(&self, picture_ids: &[String]) {
        self.services.upload_pictures(picture_ids);
    }

    fn upload_batch(&self, batch_id: &str) {
        self.services.upload_batch(batch_id);
    }

    fn edit_template(&self, template: &str, extra_tokens: &[TemplateToken]) -> Option<String> {
        self.services
            .edit_template(template, &self.token_kinds, extra_tokens)
    }

    fn substitute_tokens(&self, template: &str, tokens: &TokenValues) -> String {
        self.services.substitute_tokens(template, tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingServices {
        editor_calls: Mutex<Vec<(Vec<TokenKind>, Vec<String>)>>,
    }

    impl HostServices for RecordingServices {
        fn application_info(&self) -> ApplicationInfo {
            ApplicationInfo {
                name: "test".to_string(),
                version: "0.0.0".to_string(),
                started_at: Utc::now(),
            }
        }
        fn register_task(&self, _task: HostTask) {}
        fn enqueue_files(&self, _files: &[PathBuf]) {}
        fn upload_pictures(&self, _picture_ids: &[String]) {}
        fn upload_batch(&self, _batch_id: &str) {}
        fn edit_template(
            &self,
            template: &str,
            token_kinds: &[TokenKind],
            extra_tokens: &[TemplateToken],
        ) -> Option<String> {
            self.editor_calls.lock().push((
                token_kinds.to_vec(),
                extra_tokens.iter().map(|t| t.name.clone()).collect(),
            ));
            Some(format!("{template}!"))
        }
        fn substitute_tokens(&self, template: &str, _tokens: &TokenValues) -> String {
            template.to_uppercase()
        }
        fn populate_tokens(&self, _payload: EventPayload<'_>, _tokens: &mut TokenValues) {}
        fn notify_status(&self, _message: &str) {}
    }

    #[test]
    fn test_edit_template_passes_collection_tokens() {
        let services = Arc::new(RecordingServices::default());
        let host = InstanceHost::new(
            services.clone(),
            "acme.titles",
            "instance-1",
            vec![TokenKind::Application, TokenKind::Picture],
        );

        let edited = host.edit_template("{Title}", &[TemplateToken::new("Camera", "Camera model")]);
        assert_eq!(edited.as_deref(), Some("{Title}!"));

        let calls = services.editor_calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec![TokenKind::Application, TokenKind::Picture]);
        assert_eq!(calls[0].1, vec!["Camera".to_string()]);
    }

    #[test]
    fn test_substitute_delegates() {
        let host = InstanceHost::new(
            Arc::new(RecordingServices::default()),
            "acme.titles",
            "instance-1",
            vec![],
        );
        assert_eq!(host.substitute_tokens("abc", &TokenValues::new()), "ABC");
        assert_eq!(host.plugin_id(), "acme.titles");
        assert_eq!(host.instance_id(), "instance-1");
    }
}
