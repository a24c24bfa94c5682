//! # snapqueue-plugin-runtime
//!
//! Runtime that discovers SnapQueue plugins, keeps their live instances in
//! per-event collections and dispatches events to them with fault isolation.
//!
//! ## Flow
//!
//! 1. Implementations are registered in a [`PluginCatalog`] as a TOML
//!    manifest plus a factory.
//! 2. Discovery builds one [`PluginDescriptor`] per usable implementation
//!    and one collection per event value, plus one for rendering
//!    ([`PluginRegistry`], optionally process-wide via
//!    [`initialize_global_registry`]).
//! 3. A [`PluginManager`] resurrects persisted [`PluginConfiguration`]
//!    records into [`PluginInstance`]s and raises events into them.
//!
//! ## Example
//!
//! ```ignore
//! use snapqueue_plugin_runtime::{PluginCatalog, PluginManager, PluginRegistry};
//!
//! let registry = Arc::new(PluginRegistry::discover(&catalog));
//! let mut manager = PluginManager::new(registry, services);
//! manager.load_plugins(&config.plugins);
//! manager.on_application_event(&mut args);
//! ```

pub mod capability;
pub mod collection;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod host;
pub mod instance;
pub mod isolation;
pub mod manager;
pub mod persisted;
pub mod registry;

pub use capability::{
    CollectionCategory, CollectionKey, CollectionScope, DeclaredCapabilities, TokenKind,
    RENDERING_COLLECTION_ID,
};
pub use collection::{CollectionSpec, DispatchSummary, InstanceLedger, PluginCollection};
pub use descriptor::{
    InstantiationPolicy, PluginDescriptor, PluginFactory, PluginImplementation, PluginManifest,
};
pub use discovery::{discover, Discovery, PluginCatalog};
pub use error::{InstanceError, LifecycleStage, RuntimeError, RuntimeResult};
pub use host::{HostServices, InstanceHost, NoopHostServices};
pub use instance::{InstanceRequest, PluginInstance};
pub use isolation::{call_plugin, call_plugin_infallible};
pub use manager::PluginManager;
pub use persisted::PluginConfiguration;
#[cfg(any(test, feature = "test-util"))]
pub use registry::reset_global_registry;
pub use registry::{
    global_registry, initialize_global_registry, is_global_registry_initialized, PluginRegistry,
};
