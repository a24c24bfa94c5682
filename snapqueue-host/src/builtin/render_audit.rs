//! Render audit: records the size of every file passing through the
//! rendering chain without changing it.

use snapqueue_plugin_api::{
    Bytes, LogLevel, Plugin, PluginError, PluginHost, PluginResult, Renderer, RenderingArgs,
};
use std::sync::Arc;

pub const ID: &str = "snapqueue.builtin.render-audit";

pub const MANIFEST: &str = r#"
[plugin]
id = "snapqueue.builtin.render-audit"
name = "Render Audit"
purpose = "Logs the size of every rendered picture and video"
author = "SnapQueue"
version = "1.0.0"
instantiation = "single_per_application"

[supports]
rendering = ["picture", "video"]
"#;

#[derive(Default)]
pub struct RenderAudit {
    host: Option<Arc<dyn PluginHost>>,
    /// Size seen during rendering, held until the chain completes.
    pending: Option<usize>,
    audited: u64,
}

impl RenderAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audited(&self) -> u64 {
        self.audited
    }
}

impl Plugin for RenderAudit {
    fn initialize(&mut self, host: Arc<dyn PluginHost>) -> PluginResult<()> {
        self.host = Some(host);
        Ok(())
    }

    fn dispose(&mut self) {
        self.pending = None;
        self.host = None;
    }

    fn renderer(&mut self) -> Option<&mut dyn Renderer> {
        Some(self)
    }
}

impl Renderer for RenderAudit {
    fn on_rendering_file(&mut self, args: &RenderingArgs, input: Bytes) -> PluginResult<Bytes> {
        let Some(host) = &self.host else {
            return Err(PluginError::failed("render audit used before initialization"));
        };
        host.log(
            LogLevel::Debug,
            &format!("Rendering {} '{}'", args.content_type, args.picture.file_name),
        );
        self.pending = Some(input.len());
        Ok(input)
    }

    fn on_rendering_file_completed(&mut self, args: &RenderingArgs) -> PluginResult<()> {
        let Some(size) = self.pending.take() else {
            return Ok(());
        };
        self.audited += 1;
        if let Some(host) = &self.host {
            host.log(
                LogLevel::Info,
                &format!(
                    "Rendered {} '{}': {size} bytes",
                    args.content_type, args.picture.file_name
                ),
            );
        }
        Ok(())
    }
}
