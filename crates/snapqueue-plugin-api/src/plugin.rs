//! The plugin contract.
//!
//! Every plugin implements [`Plugin`]. Optional capabilities are exposed
//! through accessor methods that return `Some` when the plugin supports them,
//! so the runtime never has to inspect concrete types.

use crate::error::PluginResult;
use crate::events::{
    AccountEventArgs, ApplicationEventArgs, BatchEventArgs, ConfigurationEventArgs,
    GeneralAccountEventArgs, PictureEventArgs, RenderingArgs, ScheduledTaskEventArgs,
};
use crate::host::PluginHost;
use crate::settings::PluginSettings;
use bytes::Bytes;
use std::sync::Arc;

/// Base capability every plugin supports.
pub trait Plugin: Send {
    /// Called once, right after construction, with a host bound to this
    /// plugin instance.
    fn initialize(&mut self, host: Arc<dyn PluginHost>) -> PluginResult<()>;

    /// Release everything the plugin holds. Called exactly once.
    fn dispose(&mut self) {}

    /// Settings capability.
    fn settings(&mut self) -> Option<&mut dyn PluginSettings> {
        None
    }

    /// Event handling capability.
    fn event_handler(&mut self) -> Option<&mut dyn EventHandler> {
        None
    }

    /// Rendering capability.
    fn renderer(&mut self) -> Option<&mut dyn Renderer> {
        None
    }
}

/// Event handling capability. Handlers default to doing nothing, so a
/// plugin only overrides the taxonomies it declared support for.
pub trait EventHandler {
    fn on_application_event(&mut self, args: &ApplicationEventArgs) -> PluginResult<()> {
        let _ = args;
        Ok(())
    }

    fn on_configuration_event(&mut self, args: &ConfigurationEventArgs) -> PluginResult<()> {
        let _ = args;
        Ok(())
    }

    fn on_general_account_event(&mut self, args: &GeneralAccountEventArgs) -> PluginResult<()> {
        let _ = args;
        Ok(())
    }

    fn on_account_event(&mut self, args: &AccountEventArgs) -> PluginResult<()> {
        let _ = args;
        Ok(())
    }

    fn on_batch_event(&mut self, args: &BatchEventArgs) -> PluginResult<()> {
        let _ = args;
        Ok(())
    }

    fn on_picture_event(&mut self, args: &PictureEventArgs) -> PluginResult<()> {
        let _ = args;
        Ok(())
    }

    fn on_scheduled_task_event(&mut self, args: &ScheduledTaskEventArgs) -> PluginResult<()> {
        let _ = args;
        Ok(())
    }
}

/// Rendering capability.
///
/// Renderers are chained: the stream returned by one renderer is the input
/// of the next one. After the whole chain ran, every renderer that was
/// called receives `on_rendering_file_completed` in the same order.
pub trait Renderer {
    fn on_rendering_file(&mut self, args: &RenderingArgs, stream: Bytes) -> PluginResult<Bytes>;

    fn on_rendering_file_completed(&mut self, args: &RenderingArgs) -> PluginResult<()> {
        let _ = args;
        Ok(())
    }
}
