//! Plugin manager: owns every collection and raises events into them.
//!
//! The manager maps persisted [`PluginConfiguration`] records to live
//! instances, flattens them back at save and teardown time, and exposes one
//! typed raise function per event taxonomy plus the rendering pipeline.

use crate::capability::{CollectionKey, CollectionScope};
use crate::collection::{DispatchSummary, InstanceLedger, PluginCollection};
use crate::descriptor::PluginDescriptor;
use crate::error::{RuntimeError, RuntimeResult};
use crate::host::HostServices;
use crate::instance::PluginInstance;
use crate::persisted::PluginConfiguration;
use crate::registry::{global_registry, PluginRegistry};
use snapqueue_plugin_api::{
    AccountEventArgs, ApplicationEventArgs, BatchEventArgs, Bytes, ConfigurationEventArgs,
    EventHandler, EventKind, EventPayload, GeneralAccountEventArgs, PictureEventArgs,
    PluginResult, RenderingArgs, ScheduledTaskEventArgs,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Manager for all plugin collections of one application.
pub struct PluginManager {
    registry: Arc<PluginRegistry>,
    collections: Vec<PluginCollection>,
    services: Arc<dyn HostServices>,
    ledger: InstanceLedger,
}

impl PluginManager {
    /// Create a manager with one empty collection per registry collection.
    pub fn new(registry: Arc<PluginRegistry>, services: Arc<dyn HostServices>) -> Self {
        let ledger = InstanceLedger::new();
        let collections = registry
            .collections()
            .iter()
            .map(|spec| {
                PluginCollection::new(Arc::clone(spec), ledger.clone(), Arc::clone(&services))
            })
            .collect();

        Self {
            registry,
            collections,
            services,
            ledger,
        }
    }

    /// Create a manager over the process-wide registry.
    pub fn with_global_registry(services: Arc<dyn HostServices>) -> Self {
        Self::new(global_registry(), services)
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn services(&self) -> &Arc<dyn HostServices> {
        &self.services
    }

    pub fn descriptor(&self, id: &str) -> Option<&Arc<PluginDescriptor>> {
        self.registry.descriptor(id)
    }

    /// Every collection, in registry order.
    pub fn all_collections(&self) -> &[PluginCollection] {
        &self.collections
    }

    /// Collections of one scope.
    pub fn collections(&self, scope: CollectionScope) -> impl Iterator<Item = &PluginCollection> {
        self.collections.iter().filter(move |c| c.scope() == scope)
    }

    pub fn collection(&self, id: &str) -> Option<&PluginCollection> {
        self.collections.iter().find(|c| c.id() == id)
    }

    fn collection_mut(&mut self, id: &str) -> RuntimeResult<&mut PluginCollection> {
        self.collections
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or_else(|| RuntimeError::CollectionNotFound(id.to_string()))
    }

    fn collection_by_key_mut(&mut self, key: CollectionKey) -> Option<&mut PluginCollection> {
        self.collections.iter_mut().find(|c| c.key() == key)
    }

    /// Check whether any collection holds an instance of the descriptor.
    pub fn has_instance(&self, descriptor_id: &str) -> bool {
        self.ledger.has_instance(descriptor_id)
    }

    /// Resolve persisted records into live instances.
    ///
    /// Records whose collection or descriptor no longer exists, or whose
    /// instance fails to construct, are logged and skipped. Returns the
    /// number of instances loaded.
    pub fn load_plugins(&mut self, configs: &[PluginConfiguration]) -> usize {
        let mut loaded = 0;

        for config in configs {
            let Some(descriptor) = self.registry.descriptor(&config.plugin_type_id).cloned() else {
                warn!(
                    collection = %config.collection_id,
                    instance = %config.id,
                    plugin = %config.plugin_type_id,
                    "Skipping plugin configuration: unknown plugin type"
                );
                continue;
            };

            let collection = match self.collection_mut(&config.collection_id) {
                Ok(collection) => collection,
                Err(e) => {
                    warn!(
                        instance = %config.id,
                        plugin = %config.plugin_type_id,
                        error = %e,
                        "Skipping plugin configuration: unknown collection"
                    );
                    continue;
                }
            };

            let settings = (!config.settings.is_empty()).then_some(config.settings.as_str());
            match collection.add(Some(config.id.clone()), descriptor, settings, config.is_enabled) {
                Ok(_) => loaded += 1,
                Err(e) => warn!(
                    collection = %config.collection_id,
                    instance = %config.id,
                    plugin = %config.plugin_type_id,
                    error = %e,
                    "Skipping plugin configuration"
                ),
            }
        }

        info!(loaded, total = configs.len(), "Loaded plugin configurations");
        loaded
    }

    /// Flatten every instance of `scope` into persisted records without
    /// disposing anything.
    pub fn get_loaded_plugins(&mut self, scope: CollectionScope) -> Vec<PluginConfiguration> {
        let mut configs = Vec::new();
        for collection in self.collections.iter_mut().filter(|c| c.scope() == scope) {
            let collection_id = collection.id().to_string();
            for instance in collection.instances_mut() {
                configs.push(flatten(instance, &collection_id));
            }
        }
        configs
    }

    /// Flatten and dispose every instance of `scope`.
    pub fn unload_plugins(&mut self, scope: CollectionScope) -> Vec<PluginConfiguration> {
        let mut configs = Vec::new();
        for collection in self.collections.iter_mut().filter(|c| c.scope() == scope) {
            let collection_id = collection.id().to_string();
            for mut instance in collection.take_all() {
                configs.push(flatten(&mut instance, &collection_id));
                instance.dispose();
            }
        }
        info!(%scope, unloaded = configs.len(), "Unloaded plugins");
        configs
    }

    /// Check whether the descriptor is eligible for the collection and its
    /// policy allows another instance there.
    pub fn can_add(&self, collection_id: &str, descriptor_id: &str) -> RuntimeResult<bool> {
        let collection = self
            .collection(collection_id)
            .ok_or_else(|| RuntimeError::CollectionNotFound(collection_id.to_string()))?;
        let descriptor = self
            .descriptor(descriptor_id)
            .ok_or_else(|| RuntimeError::DescriptorNotFound(descriptor_id.to_string()))?;
        Ok(collection.spec().is_eligible(descriptor.id()) && collection.can_add(descriptor))
    }

    /// Eligible descriptors that can still be added to the collection.
    pub fn available_descriptors(
        &self,
        collection_id: &str,
    ) -> RuntimeResult<Vec<Arc<PluginDescriptor>>> {
        let collection = self
            .collection(collection_id)
            .ok_or_else(|| RuntimeError::CollectionNotFound(collection_id.to_string()))?;
        Ok(collection
            .eligible()
            .iter()
            .filter(|d| collection.can_add(d))
            .cloned()
            .collect())
    }

    /// Add a fresh instance and return its id.
    pub fn add_instance(
        &mut self,
        collection_id: &str,
        descriptor_id: &str,
        serialized_settings: Option<&str>,
        enabled: bool,
    ) -> RuntimeResult<String> {
        let descriptor = self
            .descriptor(descriptor_id)
            .cloned()
            .ok_or_else(|| RuntimeError::DescriptorNotFound(descriptor_id.to_string()))?;
        let collection = self.collection_mut(collection_id)?;
        let instance = collection.add(None, descriptor, serialized_settings, enabled)?;
        Ok(instance.id().to_string())
    }

    pub fn remove_instance(&mut self, collection_id: &str, instance_id: &str) -> RuntimeResult<()> {
        self.collection_mut(collection_id)?.remove(instance_id)
    }

    pub fn set_enabled(
        &mut self,
        collection_id: &str,
        instance_id: &str,
        enabled: bool,
    ) -> RuntimeResult<()> {
        let collection = self.collection_mut(collection_id)?;
        let instance = collection.instance_mut(instance_id).ok_or_else(|| {
            RuntimeError::InstanceNotFound {
                instance: instance_id.to_string(),
                collection: collection_id.to_string(),
            }
        })?;
        instance.set_enabled(enabled);
        debug!(
            collection = %collection_id,
            instance = %instance_id,
            enabled,
            "Changed enabled flag"
        );
        Ok(())
    }

    pub fn can_move_up(&self, collection_id: &str, instance_id: &str) -> bool {
        self.collection(collection_id)
            .is_some_and(|c| c.can_move_up(instance_id))
    }

    pub fn can_move_down(&self, collection_id: &str, instance_id: &str) -> bool {
        self.collection(collection_id)
            .is_some_and(|c| c.can_move_down(instance_id))
    }

    pub fn move_up(&mut self, collection_id: &str, instance_id: &str) -> RuntimeResult<bool> {
        Ok(self.collection_mut(collection_id)?.move_up(instance_id))
    }

    pub fn move_down(&mut self, collection_id: &str, instance_id: &str) -> RuntimeResult<bool> {
        Ok(self.collection_mut(collection_id)?.move_down(instance_id))
    }

    fn dispatch_event<F>(&mut self, kind: EventKind, action: F) -> DispatchSummary
    where
        F: FnMut(&mut dyn EventHandler) -> PluginResult<()>,
    {
        match self.collection_by_key_mut(CollectionKey::Event(kind)) {
            Some(collection) => {
                let summary = collection.for_each_event_handler(action, None);
                debug!(
                    collection = %collection.id(),
                    invoked = summary.invoked,
                    failed = summary.failed,
                    "Dispatched event"
                );
                summary
            }
            None => DispatchSummary::default(),
        }
    }

    pub fn on_application_event(&mut self, args: &mut ApplicationEventArgs) -> DispatchSummary {
        self.services
            .populate_tokens(EventPayload::Application(&args.application), &mut args.tokens);
        let args = &*args;
        self.dispatch_event(EventKind::Application(args.event), |h| {
            h.on_application_event(args)
        })
    }

    pub fn on_configuration_event(&mut self, args: &mut ConfigurationEventArgs) -> DispatchSummary {
        self.services
            .populate_tokens(EventPayload::Application(&args.application), &mut args.tokens);
        let args = &*args;
        self.dispatch_event(EventKind::Configuration(args.event), |h| {
            h.on_configuration_event(args)
        })
    }

    pub fn on_general_account_event(
        &mut self,
        args: &mut GeneralAccountEventArgs,
    ) -> DispatchSummary {
        self.services
            .populate_tokens(EventPayload::Account(&args.account), &mut args.tokens);
        let args = &*args;
        self.dispatch_event(EventKind::GeneralAccount(args.event), |h| {
            h.on_general_account_event(args)
        })
    }

    pub fn on_account_event(&mut self, args: &mut AccountEventArgs) -> DispatchSummary {
        self.services
            .populate_tokens(EventPayload::Account(&args.account), &mut args.tokens);
        let args = &*args;
        self.dispatch_event(EventKind::Account(args.event), |h| h.on_account_event(args))
    }

    pub fn on_batch_event(&mut self, args: &mut BatchEventArgs) -> DispatchSummary {
        self.services.populate_tokens(
            EventPayload::Batch {
                account: &args.account,
                batch: &args.batch,
            },
            &mut args.tokens,
        );
        let args = &*args;
        self.dispatch_event(EventKind::Batch(args.event), |h| h.on_batch_event(args))
    }

    pub fn on_picture_event(&mut self, args: &mut PictureEventArgs) -> DispatchSummary {
        self.services.populate_tokens(
            EventPayload::Picture {
                account: &args.account,
                picture: &args.picture,
            },
            &mut args.tokens,
        );
        let args = &*args;
        self.dispatch_event(EventKind::Picture(args.event), |h| h.on_picture_event(args))
    }

    pub fn on_scheduled_task_event(
        &mut self,
        args: &mut ScheduledTaskEventArgs,
    ) -> DispatchSummary {
        self.services
            .populate_tokens(EventPayload::ScheduledTask(&args.task), &mut args.tokens);
        let args = &*args;
        self.dispatch_event(EventKind::ScheduledTask(args.event), |h| {
            h.on_scheduled_task_event(args)
        })
    }

    /// Run a file through the rendering chain.
    ///
    /// Each enabled renderer interested in the content type receives the
    /// previous renderer's output. A renderer that fails leaves the stream
    /// as it was. Once the chain is done, every renderer that was handed the
    /// stream gets its completion call, in the same order.
    pub fn render_file(&mut self, args: &mut RenderingArgs, input: Bytes) -> Bytes {
        self.services.populate_tokens(
            EventPayload::Picture {
                account: &args.account,
                picture: &args.picture,
            },
            &mut args.tokens,
        );
        let args = &*args;

        let Some(collection) = self.collection_by_key_mut(CollectionKey::Rendering) else {
            return input;
        };

        let content_type = args.content_type;
        let interested = |instance: &PluginInstance| {
            instance
                .descriptor()
                .capabilities()
                .supports_rendering(content_type)
        };

        let mut stream = input;
        let rendered = collection.for_each_renderer(
            |renderer| {
                stream = renderer.on_rendering_file(args, stream.clone())?;
                Ok(())
            },
            Some(&interested),
        );
        let completed = collection.for_each_renderer(
            |renderer| renderer.on_rendering_file_completed(args),
            Some(&interested),
        );

        debug!(
            %content_type,
            rendered = rendered.invoked,
            failed = rendered.failed + completed.failed,
            bytes = stream.len(),
            "Rendered file"
        );
        stream
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("collections", &self.collections.len())
            .field("descriptors", &self.registry.descriptors().len())
            .finish_non_exhaustive()
    }
}

fn flatten(instance: &mut PluginInstance, collection_id: &str) -> PluginConfiguration {
    let settings = instance.get_serialized_settings().unwrap_or_else(|e| {
        warn!(
            collection = %collection_id,
            instance = %instance.id(),
            error = %e,
            "Failed to serialize plugin settings; persisting defaults"
        );
        String::new()
    });

    PluginConfiguration {
        id: instance.id().to_string(),
        is_enabled: instance.is_enabled(),
        settings,
        collection_id: collection_id.to_string(),
        plugin_type_id: instance.descriptor().id().to_string(),
    }
}
