//! Host services backing every plugin's host facade.
//!
//! Tasks registered by plugins run on tokio's blocking pool. Upload and queue
//! requests are recorded for the session runner to act on.

use crate::template;
use parking_lot::Mutex;
use snapqueue_plugin_api::{ApplicationInfo, EventPayload, HostTask, TemplateToken, TokenValues};
use snapqueue_plugin_runtime::{HostServices, TokenKind};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// An upload requested by a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRequest {
    Pictures(Vec<String>),
    Batch(String),
}

/// [`HostServices`] for the SnapQueue host application.
pub struct AppServices {
    info: ApplicationInfo,
    runtime: Handle,
    tasks: Mutex<Vec<(String, JoinHandle<()>)>>,
    queue: Mutex<Vec<PathBuf>>,
    uploads: Mutex<Vec<UploadRequest>>,
    statuses: Mutex<Vec<String>>,
}

impl AppServices {
    /// Create services that spawn plugin tasks on `runtime`.
    pub fn new(info: ApplicationInfo, runtime: Handle) -> Self {
        Self {
            info,
            runtime,
            tasks: Mutex::new(Vec::new()),
            queue: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            statuses: Mutex::new(Vec::new()),
        }
    }

    /// Files queued for upload so far.
    pub fn queued_files(&self) -> Vec<PathBuf> {
        self.queue.lock().clone()
    }

    /// Uploads requested so far.
    pub fn upload_requests(&self) -> Vec<UploadRequest> {
        self.uploads.lock().clone()
    }

    /// Status notifications raised so far.
    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().clone()
    }

    /// Wait for every task registered so far. Returns how many finished.
    pub async fn wait_for_tasks(&self) -> usize {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let mut finished = 0;
        for (name, handle) in tasks {
            match handle.await {
                Ok(()) => finished += 1,
                Err(e) => error!(task = %name, error = %e, "Plugin task did not finish"),
            }
        }
        finished
    }
}

impl HostServices for AppServices {
    fn application_info(&self) -> ApplicationInfo {
        self.info.clone()
    }

    fn register_task(&self, task: HostTask) {
        let name = task.name.clone();
        let task_name = name.clone();
        let handle = self.runtime.spawn_blocking(move || {
            let started = std::time::Instant::now();
            match (task.work)() {
                Ok(()) => info!(
                    task = %task_name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Plugin task finished"
                ),
                Err(e) => error!(task = %task_name, error = %e, "Plugin task failed"),
            }
        });
        self.tasks.lock().push((name, handle));
    }

    fn enqueue_files(&self, files: &[PathBuf]) {
        info!(count = files.len(), "Queueing files for upload");
        self.queue.lock().extend_from_slice(files);
    }

    fn upload_pictures(&self, picture_ids: &[String]) {
        info!(count = picture_ids.len(), "Upload of pictures requested");
        self.uploads
            .lock()
            .push(UploadRequest::Pictures(picture_ids.to_vec()));
    }

    fn upload_batch(&self, batch_id: &str) {
        info!(batch = %batch_id, "Upload of batch requested");
        self.uploads
            .lock()
            .push(UploadRequest::Batch(batch_id.to_string()));
    }

    /// Without an editor window, accept the template when every token it
    /// references is available.
    fn edit_template(
        &self,
        template: &str,
        token_kinds: &[TokenKind],
        extra_tokens: &[TemplateToken],
    ) -> Option<String> {
        let known: HashSet<String> = token_kinds
            .iter()
            .flat_map(|kind| template::tokens_for(*kind))
            .chain(extra_tokens.iter().cloned())
            .map(|token| token.name)
            .collect();

        let unknown: Vec<&str> = template::referenced_tokens(template)
            .into_iter()
            .filter(|name| !known.contains(*name))
            .collect();

        if unknown.is_empty() {
            Some(template.to_string())
        } else {
            warn!(?unknown, "Template references unavailable tokens");
            None
        }
    }

    fn substitute_tokens(&self, template: &str, tokens: &TokenValues) -> String {
        template::substitute(template, tokens)
    }

    fn populate_tokens(&self, payload: EventPayload<'_>, tokens: &mut TokenValues) {
        template::populate(&self.info, payload, tokens);
    }

    fn notify_status(&self, message: &str) {
        warn!(status = %message, "Plugin status");
        self.statuses.lock().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use snapqueue_plugin_api::PluginError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn services() -> AppServices {
        AppServices::new(
            ApplicationInfo {
                name: "SnapQueue".to_string(),
                version: "0.1.0".to_string(),
                started_at: Utc::now(),
            },
            Handle::current(),
        )
    }

    #[tokio::test]
    async fn test_registered_tasks_run_and_are_awaited() {
        let services = services();
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let runs = Arc::clone(&runs);
            services.register_task(HostTask::new("count", move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }
        services.register_task(HostTask::new("fail", || Err(PluginError::failed("nope"))));

        assert_eq!(services.wait_for_tasks().await, 4);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(services.wait_for_tasks().await, 0);
    }

    #[tokio::test]
    async fn test_edit_template_checks_tokens() {
        let services = services();
        let kinds = [TokenKind::Application, TokenKind::Picture];

        assert_eq!(
            services.edit_template("{AppName} {Title}", &kinds, &[]),
            Some("{AppName} {Title}".to_string())
        );
        assert_eq!(services.edit_template("{BatchId}", &kinds, &[]), None);
        assert!(services
            .edit_template("{Camera}", &kinds, &[TemplateToken::new("Camera", "Camera model")])
            .is_some());
    }

    #[tokio::test]
    async fn test_requests_are_recorded() {
        let services = services();
        services.enqueue_files(&[PathBuf::from("a.jpg")]);
        services.upload_pictures(&["p1".to_string()]);
        services.upload_batch("b1");
        services.notify_status("something failed");

        assert_eq!(services.queued_files(), vec![PathBuf::from("a.jpg")]);
        assert_eq!(
            services.upload_requests(),
            vec![
                UploadRequest::Pictures(vec!["p1".to_string()]),
                UploadRequest::Batch("b1".to_string()),
            ]
        );
        assert_eq!(services.statuses(), vec!["something failed".to_string()]);
    }
}
