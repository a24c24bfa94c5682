//! Plugin collections: one ordered set of live instances per event value,
//! plus one for rendering.
//!
//! The structure of every collection (id, scope, eligible descriptors) is
//! fixed at discovery time and shared through [`CollectionSpec`]. Only the
//! instance sequence changes afterwards. Order matters: it is the priority
//! order for event dispatch and the chain order for rendering.

use crate::capability::{CollectionCategory, CollectionKey, CollectionScope, TokenKind};
use crate::descriptor::{InstantiationPolicy, PluginDescriptor};
use crate::error::{RuntimeError, RuntimeResult};
use crate::host::HostServices;
use crate::instance::{InstanceRequest, PluginInstance};
use crate::isolation::call_plugin;
use parking_lot::Mutex;
use snapqueue_plugin_api::{EventHandler, EventKind, Plugin, PluginResult, Renderer};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Immutable structure of one collection.
#[derive(Debug)]
pub struct CollectionSpec {
    key: CollectionKey,
    id: String,
    description: String,
    token_kinds: Vec<TokenKind>,
    eligible: Vec<Arc<PluginDescriptor>>,
}

impl CollectionSpec {
    /// Build the spec for `key`, keeping only descriptors it accepts.
    pub fn new(key: CollectionKey, descriptors: &[Arc<PluginDescriptor>]) -> Self {
        let eligible = descriptors
            .iter()
            .filter(|d| key.accepts(d.capabilities()))
            .cloned()
            .collect();

        Self {
            key,
            id: key.id(),
            description: key.description(),
            token_kinds: key.token_kinds(),
            eligible,
        }
    }

    pub fn key(&self) -> CollectionKey {
        self.key
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn token_kinds(&self) -> &[TokenKind] {
        &self.token_kinds
    }

    pub fn eligible(&self) -> &[Arc<PluginDescriptor>] {
        &self.eligible
    }

    pub fn is_eligible(&self, descriptor_id: &str) -> bool {
        self.eligible.iter().any(|d| d.id() == descriptor_id)
    }
}

/// Live instances across every collection of one manager: a count per
/// descriptor and the set of instance ids in use.
///
/// Shared by all collections of one manager so single-per-application
/// checks and instance id uniqueness see instances anywhere.
#[derive(Debug, Clone, Default)]
pub struct InstanceLedger {
    state: Arc<Mutex<LedgerState>>,
}

#[derive(Debug, Default)]
struct LedgerState {
    descriptors: HashMap<String, usize>,
    instances: HashSet<String>,
}

impl InstanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether any live instance references the descriptor.
    pub fn has_instance(&self, descriptor_id: &str) -> bool {
        self.state
            .lock()
            .descriptors
            .get(descriptor_id)
            .is_some_and(|count| *count > 0)
    }

    /// Check whether a live instance already uses this instance id.
    pub fn contains_instance_id(&self, instance_id: &str) -> bool {
        self.state.lock().instances.contains(instance_id)
    }

    fn record(&self, descriptor_id: &str, instance_id: &str) {
        let mut state = self.state.lock();
        *state
            .descriptors
            .entry(descriptor_id.to_string())
            .or_insert(0) += 1;
        state.instances.insert(instance_id.to_string());
    }

    fn release(&self, descriptor_id: &str, instance_id: &str) {
        let mut state = self.state.lock();
        state.instances.remove(instance_id);
        if let Some(count) = state.descriptors.get_mut(descriptor_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.descriptors.remove(descriptor_id);
            }
        }
    }
}

/// Outcome of one isolated dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Instances whose capability was called, including failed calls.
    pub invoked: usize,
    /// Instances whose call returned an error or panicked.
    pub failed: usize,
}

/// Optional filter applied to each enabled instance before dispatch.
pub type InstanceSelector<'a> = &'a dyn Fn(&PluginInstance) -> bool;

/// Ordered set of live instances sharing one event value or the rendering
/// category.
pub struct PluginCollection {
    spec: Arc<CollectionSpec>,
    instances: Vec<PluginInstance>,
    ledger: InstanceLedger,
    services: Arc<dyn HostServices>,
}

impl PluginCollection {
    pub fn new(
        spec: Arc<CollectionSpec>,
        ledger: InstanceLedger,
        services: Arc<dyn HostServices>,
    ) -> Self {
        Self {
            spec,
            instances: Vec::new(),
            ledger,
            services,
        }
    }

    pub fn spec(&self) -> &Arc<CollectionSpec> {
        &self.spec
    }

    pub fn id(&self) -> &str {
        self.spec.id()
    }

    pub fn key(&self) -> CollectionKey {
        self.spec.key()
    }

    /// The event value this collection dispatches, `None` for rendering.
    pub fn event(&self) -> Option<EventKind> {
        match self.spec.key() {
            CollectionKey::Event(kind) => Some(kind),
            CollectionKey::Rendering => None,
        }
    }

    pub fn scope(&self) -> CollectionScope {
        self.spec.key().scope()
    }

    pub fn category(&self) -> CollectionCategory {
        self.spec.key().category()
    }

    pub fn description(&self) -> &str {
        self.spec.description()
    }

    pub fn token_kinds(&self) -> &[TokenKind] {
        self.spec.token_kinds()
    }

    pub fn eligible(&self) -> &[Arc<PluginDescriptor>] {
        self.spec.eligible()
    }

    /// Loaded instances, in dispatch order.
    pub fn instances(&self) -> &[PluginInstance] {
        &self.instances
    }

    pub(crate) fn instances_mut(&mut self) -> impl Iterator<Item = &mut PluginInstance> {
        self.instances.iter_mut()
    }

    pub fn instance(&self, instance_id: &str) -> Option<&PluginInstance> {
        self.instances.iter().find(|i| i.id() == instance_id)
    }

    pub fn instance_mut(&mut self, instance_id: &str) -> Option<&mut PluginInstance> {
        self.instances.iter_mut().find(|i| i.id() == instance_id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Check whether an instance of the descriptor is loaded here.
    pub fn contains_descriptor(&self, descriptor_id: &str) -> bool {
        self.instances
            .iter()
            .any(|i| i.descriptor().id() == descriptor_id)
    }

    /// Check whether the instantiation policy allows another instance of
    /// `descriptor` in this collection.
    pub fn can_add(&self, descriptor: &PluginDescriptor) -> bool {
        match descriptor.instantiation() {
            InstantiationPolicy::MultiplePerScope => true,
            InstantiationPolicy::SinglePerScope => !self.contains_descriptor(descriptor.id()),
            InstantiationPolicy::SinglePerApplication => {
                !self.ledger.has_instance(descriptor.id())
            }
        }
    }

    /// Construct a new instance and append it to the sequence.
    ///
    /// Eligibility, policy and instance id uniqueness are checked before
    /// anything is constructed; on failure the collection is left unchanged.
    pub fn add(
        &mut self,
        id: Option<String>,
        descriptor: Arc<PluginDescriptor>,
        serialized_settings: Option<&str>,
        enabled: bool,
    ) -> RuntimeResult<&PluginInstance> {
        if !self.spec.is_eligible(descriptor.id()) {
            return Err(RuntimeError::NotEligible {
                plugin: descriptor.id().to_string(),
                collection: self.id().to_string(),
            });
        }

        if !self.can_add(&descriptor) {
            return Err(RuntimeError::PolicyViolation {
                plugin: descriptor.id().to_string(),
                collection: self.id().to_string(),
                policy: descriptor.instantiation(),
            });
        }

        if let Some(instance_id) = id.as_deref() {
            if self.ledger.contains_instance_id(instance_id) {
                return Err(RuntimeError::DuplicateInstance {
                    instance: instance_id.to_string(),
                    collection: self.id().to_string(),
                });
            }
        }

        let descriptor_id = descriptor.id().to_string();
        let instance = PluginInstance::create(InstanceRequest {
            id,
            collection_id: self.spec.id(),
            token_kinds: self.spec.token_kinds().to_vec(),
            descriptor,
            services: Arc::clone(&self.services),
            serialized_settings,
            enabled,
        })?;

        info!(
            collection = %self.id(),
            plugin = %descriptor_id,
            instance = %instance.id(),
            enabled,
            "Added plugin instance"
        );

        self.ledger.record(&descriptor_id, instance.id());
        self.instances.push(instance);
        let index = self.instances.len() - 1;
        Ok(&self.instances[index])
    }

    /// Dispose an instance and remove it from the sequence.
    pub fn remove(&mut self, instance_id: &str) -> RuntimeResult<()> {
        let index = self.position(instance_id)?;
        let mut instance = self.instances.remove(index);
        instance.dispose();
        self.ledger.release(instance.descriptor().id(), instance.id());
        info!(collection = %self.id(), instance = %instance_id, "Removed plugin instance");
        Ok(())
    }

    /// Remove every instance without disposing it, in order.
    pub(crate) fn take_all(&mut self) -> Vec<PluginInstance> {
        let instances = std::mem::take(&mut self.instances);
        for instance in &instances {
            self.ledger.release(instance.descriptor().id(), instance.id());
        }
        instances
    }

    pub fn can_move_up(&self, instance_id: &str) -> bool {
        matches!(self.position(instance_id), Ok(index) if index > 0)
    }

    pub fn can_move_down(&self, instance_id: &str) -> bool {
        matches!(self.position(instance_id), Ok(index) if index + 1 < self.instances.len())
    }

    /// Swap the instance with its predecessor. Returns `false` when it is
    /// already first or not a member.
    pub fn move_up(&mut self, instance_id: &str) -> bool {
        if !self.can_move_up(instance_id) {
            return false;
        }
        if let Ok(index) = self.position(instance_id) {
            self.instances.swap(index - 1, index);
            debug!(collection = %self.id(), instance = %instance_id, "Moved plugin instance up");
        }
        true
    }

    /// Swap the instance with its successor. Returns `false` when it is
    /// already last or not a member.
    pub fn move_down(&mut self, instance_id: &str) -> bool {
        if !self.can_move_down(instance_id) {
            return false;
        }
        if let Ok(index) = self.position(instance_id) {
            self.instances.swap(index, index + 1);
            debug!(collection = %self.id(), instance = %instance_id, "Moved plugin instance down");
        }
        true
    }

    fn position(&self, instance_id: &str) -> RuntimeResult<usize> {
        self.instances
            .iter()
            .position(|i| i.id() == instance_id)
            .ok_or_else(|| RuntimeError::InstanceNotFound {
                instance: instance_id.to_string(),
                collection: self.id().to_string(),
            })
    }

    /// Invoke `action` on every enabled instance that passes `selector`,
    /// in order.
    ///
    /// `action` returns `None` when the live plugin does not expose the
    /// capability being dispatched; such instances are skipped. Every call
    /// is isolated: errors and panics are logged, surfaced as a status
    /// notification and counted, and dispatch continues with the next
    /// instance. Nothing escapes this method.
    pub fn for_each_enabled<F>(
        &mut self,
        mut action: F,
        selector: Option<InstanceSelector<'_>>,
    ) -> DispatchSummary
    where
        F: FnMut(&mut dyn Plugin) -> Option<PluginResult<()>>,
    {
        let mut summary = DispatchSummary::default();
        let collection_id = self.spec.id();

        for instance in self.instances.iter_mut() {
            if !instance.is_enabled() {
                continue;
            }
            if let Some(select) = selector {
                if !select(instance) {
                    continue;
                }
            }

            let plugin_id = instance.descriptor().id().to_string();
            let instance_id = instance.id().to_string();
            let Some(plugin) = instance.plugin_mut() else {
                continue;
            };

            match call_plugin(|| action(plugin).transpose()) {
                Ok(None) => {}
                Ok(Some(())) => summary.invoked += 1,
                Err(source) => {
                    summary.invoked += 1;
                    summary.failed += 1;

                    let failure = RuntimeError::Dispatch {
                        instance: instance_id.clone(),
                        collection: collection_id.to_string(),
                        source,
                    };
                    error!(
                        collection = %collection_id,
                        instance = %instance_id,
                        plugin = %plugin_id,
                        error = %failure,
                        "Plugin instance failed during dispatch"
                    );
                    self.services.notify_status(&failure.to_string());
                }
            }
        }

        summary
    }

    /// [`for_each_enabled`](Self::for_each_enabled) over the event handling
    /// capability.
    pub fn for_each_event_handler<F>(
        &mut self,
        mut action: F,
        selector: Option<InstanceSelector<'_>>,
    ) -> DispatchSummary
    where
        F: FnMut(&mut dyn EventHandler) -> PluginResult<()>,
    {
        self.for_each_enabled(
            |plugin| plugin.event_handler().map(|handler| action(handler)),
            selector,
        )
    }

    /// [`for_each_enabled`](Self::for_each_enabled) over the rendering
    /// capability.
    pub fn for_each_renderer<F>(
        &mut self,
        mut action: F,
        selector: Option<InstanceSelector<'_>>,
    ) -> DispatchSummary
    where
        F: FnMut(&mut dyn Renderer) -> PluginResult<()>,
    {
        self.for_each_enabled(
            |plugin| plugin.renderer().map(|renderer| action(renderer)),
            selector,
        )
    }
}

impl std::fmt::Debug for PluginCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCollection")
            .field("id", &self.spec.id())
            .field("instances", &self.instances)
            .finish_non_exhaustive()
    }
}
