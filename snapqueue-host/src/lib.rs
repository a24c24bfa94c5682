//! # snapqueue-host
//!
//! The SnapQueue host application around the plugin runtime.
//!
//! This crate provides:
//! - TOML configuration with persisted plugin instances ([`config`])
//! - The [`HostServices`](snapqueue_plugin_runtime::HostServices)
//!   implementation plugins reach through their host facade ([`services`])
//! - Template token population and substitution ([`template`])
//! - The built-in plugins ([`builtin`])
//! - Command line arguments ([`cli`])
//! - The startup → account session → shutdown cycle ([`session`])

pub mod builtin;
pub mod cli;
pub mod config;
pub mod logging;
pub mod services;
pub mod session;
pub mod template;

pub use builtin::builtin_catalog;
pub use config::{AccountConfig, AppConfig, Config};
pub use services::{AppServices, UploadRequest};
pub use session::{run_session, SessionReport};
