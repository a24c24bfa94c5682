//! # snapqueue-host
//!
//! Runs one plugin session: loads the configuration, discovers the built-in
//! plugins, replays startup, per-account and shutdown events through them and
//! saves the resulting plugin configuration.
//!
//! ## Running
//!
//! ```bash
//! # Use the default config at $XDG_CONFIG_HOME/snapqueue/config.toml
//! cargo run --bin snapqueue-host
//!
//! # Use a specific config file, with debug logging
//! RUST_LOG=debug cargo run --bin snapqueue-host -- --config ./config.toml
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use snapqueue_host::cli::Cli;
use snapqueue_host::config::Config;
use snapqueue_host::logging::init_logging;
use snapqueue_host::session::app_services;
use snapqueue_host::{builtin_catalog, run_session};
use snapqueue_plugin_runtime::{initialize_global_registry, PluginManager};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path()?;

    let mut config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        Config::load_default().context("Failed to create default configuration")?
    };

    init_logging(&config.app.log_level);
    info!("Starting snapqueue-host v{}", env!("CARGO_PKG_VERSION"));
    info!("Using configuration at {}", config_path.display());

    let registry = initialize_global_registry(&builtin_catalog());
    for descriptor in registry.descriptors() {
        info!(
            plugin = %descriptor.id(),
            policy = %descriptor.instantiation(),
            "Available plugin: {}",
            descriptor.name()
        );
    }

    let services = app_services(&config);
    let mut manager = PluginManager::new(registry, services.clone());

    let report = run_session(&mut config, &mut manager, &services).await;
    info!(
        application_plugins = report.application_plugins,
        account_plugins = report.account_plugins,
        events = report.events_dispatched,
        failures = report.dispatch_failures,
        "Session complete"
    );

    config
        .save(&config_path)
        .with_context(|| format!("Failed to save config to {}", config_path.display()))?;

    info!("Saved configuration to {}", config_path.display());
    Ok(())
}
