//! One startup → account session → shutdown cycle.

use crate::config::Config;
use crate::services::AppServices;
use chrono::Utc;
use snapqueue_plugin_api::{
    AccountEventArgs, AccountEventType, ApplicationEventArgs, ApplicationEventType,
    ApplicationInfo, Bytes, ConfigurationEventArgs, ConfigurationEventType, PictureEventArgs,
    PictureEventType, PictureInfo, RenderingArgs, RenderingContentType, TokenValues,
};
use snapqueue_plugin_runtime::{CollectionScope, DispatchSummary, HostServices, PluginManager};
use std::sync::Arc;
use tracing::info;

/// What happened during a session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub application_plugins: usize,
    pub account_plugins: usize,
    pub events_dispatched: usize,
    pub dispatch_failures: usize,
    pub rendered_bytes: usize,
    pub tasks_finished: usize,
}

impl SessionReport {
    fn record(&mut self, summary: DispatchSummary) {
        self.events_dispatched += summary.invoked;
        self.dispatch_failures += summary.failed;
    }
}

/// Drive the plugin lifecycle for every configured account.
///
/// Account-scoped plugins are unloaded back into each account's entry and
/// application-scoped plugins into `config.plugins`, so the caller can save
/// `config` afterwards.
pub async fn run_session(
    config: &mut Config,
    manager: &mut PluginManager,
    services: &AppServices,
) -> SessionReport {
    let mut report = SessionReport::default();
    let application = services.application_info();

    report.application_plugins = manager.load_plugins(&config.plugins);
    report.record(manager.on_application_event(&mut ApplicationEventArgs {
        event: ApplicationEventType::Initialized,
        application: application.clone(),
        tokens: TokenValues::new(),
    }));
    report.record(manager.on_configuration_event(&mut ConfigurationEventArgs {
        event: ConfigurationEventType::Loaded,
        application: application.clone(),
        tokens: TokenValues::new(),
    }));

    for account in config.accounts.iter_mut() {
        let info = account.info();
        info!(account = %info.id, "Activating account");

        report.account_plugins += manager.load_plugins(&account.plugins);
        report.record(manager.on_account_event(&mut AccountEventArgs {
            event: AccountEventType::Activated,
            account: info.clone(),
            tokens: TokenValues::new(),
        }));

        let picture = PictureInfo {
            id: format!("{}-sample", info.id),
            file_name: "sample.jpg".to_string(),
            title: "Sample".to_string(),
            date_taken: Some(Utc::now()),
            ..Default::default()
        };
        report.record(manager.on_picture_event(&mut PictureEventArgs {
            event: PictureEventType::Added,
            account: info.clone(),
            picture: picture.clone(),
            tokens: TokenValues::new(),
        }));

        let rendered = manager.render_file(
            &mut RenderingArgs {
                content_type: RenderingContentType::Picture,
                account: info.clone(),
                picture,
                tokens: TokenValues::new(),
            },
            Bytes::from_static(b"\xFF\xD8\xFF\xE0sample"),
        );
        report.rendered_bytes += rendered.len();

        report.record(manager.on_account_event(&mut AccountEventArgs {
            event: AccountEventType::Deactivated,
            account: info,
            tokens: TokenValues::new(),
        }));
        account.plugins = manager.unload_plugins(CollectionScope::Account);
    }

    report.record(manager.on_configuration_event(&mut ConfigurationEventArgs {
        event: ConfigurationEventType::Saving,
        application: application.clone(),
        tokens: TokenValues::new(),
    }));
    report.record(manager.on_application_event(&mut ApplicationEventArgs {
        event: ApplicationEventType::Closing,
        application,
        tokens: TokenValues::new(),
    }));
    config.plugins = manager.unload_plugins(CollectionScope::Application);

    report.tasks_finished = services.wait_for_tasks().await;
    info!(?report, "Session finished");
    report
}

/// Application info for this build.
pub fn build_application_info(name: &str) -> ApplicationInfo {
    ApplicationInfo {
        name: name.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: Utc::now(),
    }
}

/// Shared services for a session on the current tokio runtime.
pub fn app_services(config: &Config) -> Arc<AppServices> {
    Arc::new(AppServices::new(
        build_application_info(&config.app.name),
        tokio::runtime::Handle::current(),
    ))
}
