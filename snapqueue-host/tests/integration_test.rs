//! End-to-end session tests with the built-in plugins.

use snapqueue_host::builtin::{activity_log, auto_upload, render_audit};
use snapqueue_host::config::{AccountConfig, Config};
use snapqueue_host::session::app_services;
use snapqueue_host::{builtin_catalog, run_session, UploadRequest};
use snapqueue_plugin_runtime::{
    global_registry, initialize_global_registry, reset_global_registry, CollectionScope,
    PluginConfiguration, PluginManager, PluginRegistry,
};
use std::sync::Arc;
use tempfile::TempDir;

fn session_config() -> Config {
    let mut config = Config::default();
    config.plugins = vec![
        PluginConfiguration::new("log-init", "application:initialized", activity_log::ID),
        PluginConfiguration::new("log-close", "application:closing", activity_log::ID)
            .with_settings(r#"{"verbose":true}"#),
        PluginConfiguration::new("stale", "application:closing", "acme.uninstalled"),
    ];
    config.accounts = vec![AccountConfig {
        id: "a1".to_string(),
        name: "Family".to_string(),
        plugins: vec![
            PluginConfiguration::new("up", "picture:added", auto_upload::ID),
            PluginConfiguration::new("audit", "rendering", render_audit::ID),
            PluginConfiguration::new("gone", "picture:teleported", activity_log::ID),
        ],
    }];
    config
}

#[tokio::test]
async fn test_session_runs_builtin_plugins() {
    let mut config = session_config();
    let services = app_services(&config);
    let registry = Arc::new(PluginRegistry::discover(&builtin_catalog()));
    let mut manager = PluginManager::new(registry, services.clone());

    let report = run_session(&mut config, &mut manager, &services).await;

    assert_eq!(report.application_plugins, 2);
    assert_eq!(report.account_plugins, 2);
    assert_eq!(report.events_dispatched, 3);
    assert_eq!(report.dispatch_failures, 0);
    assert_eq!(report.rendered_bytes, 10);
    assert_eq!(report.tasks_finished, 1);

    assert_eq!(
        services.upload_requests(),
        vec![UploadRequest::Pictures(vec!["a1-sample".to_string()])]
    );
    assert!(services.statuses().is_empty());

    // Everything was unloaded back into the configuration.
    assert!(manager
        .get_loaded_plugins(CollectionScope::Application)
        .is_empty());
    assert!(!manager.has_instance(render_audit::ID));

    let app_ids: Vec<&str> = config.plugins.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(app_ids, ["log-init", "log-close"]);
    assert_eq!(config.plugins[0].settings, r#"{"verbose":false}"#);
    assert_eq!(config.plugins[1].settings, r#"{"verbose":true}"#);

    let account = &config.accounts[0];
    let account_ids: Vec<&str> = account.plugins.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(account_ids, ["up", "audit"]);
    assert_eq!(
        account.plugins[0].settings,
        r#"{"upload_on_add":true,"title_template":"{FileName}"}"#
    );
    assert!(account.plugins[1].settings.is_empty());
}

#[tokio::test]
async fn test_session_output_survives_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = session_config();
    let services = app_services(&config);
    let registry = Arc::new(PluginRegistry::discover(&builtin_catalog()));
    let mut manager = PluginManager::new(registry.clone(), services.clone());
    run_session(&mut config, &mut manager, &services).await;
    config.save(&path).unwrap();

    let mut reloaded = Config::load(&path).unwrap();
    assert_eq!(reloaded, config);

    // A second session over the saved file loads every surviving entry.
    let services = app_services(&reloaded);
    let mut manager = PluginManager::new(registry, services.clone());
    let report = run_session(&mut reloaded, &mut manager, &services).await;
    assert_eq!(report.application_plugins, 2);
    assert_eq!(report.account_plugins, 2);
    assert_eq!(reloaded, config);
}

#[tokio::test]
async fn test_render_audit_is_single_per_application() {
    let config = Config::default();
    let services = app_services(&config);
    let registry = Arc::new(PluginRegistry::discover(&builtin_catalog()));
    let mut manager = PluginManager::new(registry, services);

    manager
        .add_instance("rendering", render_audit::ID, None, true)
        .unwrap();
    assert!(!manager.can_add("rendering", render_audit::ID).unwrap());
    assert!(manager
        .available_descriptors("rendering")
        .unwrap()
        .is_empty());

    manager
        .add_instance("picture:added", auto_upload::ID, None, true)
        .unwrap();
    assert!(manager
        .add_instance("picture:added", auto_upload::ID, None, true)
        .is_err());
}

#[test]
fn test_global_registry_with_builtins() {
    reset_global_registry();
    let registry = initialize_global_registry(&builtin_catalog());
    assert_eq!(registry.descriptors().len(), 3);
    assert!(Arc::ptr_eq(&registry, &global_registry()));
    reset_global_registry();
}
