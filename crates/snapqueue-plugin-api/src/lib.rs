//! # snapqueue-plugin-api
//!
//! The contract SnapQueue plugins are written against.
//!
//! This crate provides:
//! - The [`Plugin`] trait and its optional capabilities
//!   ([`PluginSettings`], [`EventHandler`], [`Renderer`])
//! - The closed event taxonomies and their argument types
//! - The [`PluginHost`] facade plugins use to talk to the application
//!
//! Plugins depend on this crate only; the runtime that discovers, loads and
//! dispatches to them lives in `snapqueue-plugin-runtime`.

pub mod error;
pub mod events;
pub mod host;
pub mod plugin;
pub mod settings;

pub use bytes::Bytes;
pub use error::{PluginError, PluginResult};
pub use events::{
    AccountEventArgs, AccountEventType, AccountInfo, ApplicationEventArgs, ApplicationEventType,
    ApplicationInfo, BatchEventArgs, BatchEventType, BatchInfo, ConfigurationEventArgs,
    ConfigurationEventType, EventKind, EventPayload, GeneralAccountEventArgs,
    GeneralAccountEventType, PictureEventArgs, PictureEventType, PictureInfo, RenderingArgs,
    RenderingContentType, ScheduledTaskEventArgs, ScheduledTaskEventType, ScheduledTaskInfo,
    TokenValues,
};
pub use host::{HostTask, LogLevel, PluginHost, TemplateToken};
pub use plugin::{EventHandler, Plugin, Renderer};
pub use settings::{PluginSettings, SettingsEditor, TypedSettings};
