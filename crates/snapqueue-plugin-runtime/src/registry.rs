//! The immutable result of discovery and its process-wide instance.

use crate::capability::{CollectionKey, CollectionScope};
use crate::collection::CollectionSpec;
use crate::descriptor::PluginDescriptor;
use crate::discovery::{discover, PluginCatalog};
use crate::isolation::extract_panic_message;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discovered descriptors and the collection structure built from them.
///
/// Read-only once built; live instances are owned by a
/// [`PluginManager`](crate::PluginManager).
#[derive(Debug, Default)]
pub struct PluginRegistry {
    descriptors: Vec<Arc<PluginDescriptor>>,
    collections: Vec<Arc<CollectionSpec>>,
}

impl PluginRegistry {
    /// Run discovery over a catalog.
    pub fn discover(catalog: &PluginCatalog) -> Self {
        let discovery = discover(catalog);
        Self {
            descriptors: discovery.descriptors,
            collections: discovery.collections,
        }
    }

    /// A registry with no plugins but the full collection structure.
    pub fn empty() -> Self {
        Self::discover(&PluginCatalog::new())
    }

    pub fn descriptors(&self) -> &[Arc<PluginDescriptor>] {
        &self.descriptors
    }

    pub fn descriptor(&self, id: &str) -> Option<&Arc<PluginDescriptor>> {
        self.descriptors.iter().find(|d| d.id() == id)
    }

    pub fn collections(&self) -> &[Arc<CollectionSpec>] {
        &self.collections
    }

    pub fn collection(&self, id: &str) -> Option<&Arc<CollectionSpec>> {
        self.collections.iter().find(|c| c.id() == id)
    }

    pub fn collection_by_key(&self, key: CollectionKey) -> Option<&Arc<CollectionSpec>> {
        self.collections.iter().find(|c| c.key() == key)
    }

    /// Collections of one scope, in registry order.
    pub fn collections_in_scope(
        &self,
        scope: CollectionScope,
    ) -> impl Iterator<Item = &Arc<CollectionSpec>> {
        self.collections
            .iter()
            .filter(move |c| c.key().scope() == scope)
    }
}

static GLOBAL_REGISTRY: RwLock<Option<Arc<PluginRegistry>>> = parking_lot::const_rwlock(None);

#[cfg(test)]
static PANIC_DURING_DISCOVERY: std::sync::atomic::AtomicBool =
    std::sync::atomic::AtomicBool::new(false);

#[cfg(test)]
fn panic_if_requested() {
    if PANIC_DURING_DISCOVERY.load(std::sync::atomic::Ordering::SeqCst) {
        panic!("discovery blew up");
    }
}

fn discover_global(catalog: &PluginCatalog) -> PluginRegistry {
    #[cfg(test)]
    panic_if_requested();
    PluginRegistry::discover(catalog)
}

/// Run discovery once for the whole process.
///
/// A second call keeps the existing registry and logs a warning. If
/// discovery panics the process continues with an empty registry.
pub fn initialize_global_registry(catalog: &PluginCatalog) -> Arc<PluginRegistry> {
    let mut slot = GLOBAL_REGISTRY.write();
    if let Some(existing) = slot.as_ref() {
        warn!("Global plugin registry already initialized; ignoring new catalog");
        return Arc::clone(existing);
    }

    let registry = match catch_unwind(AssertUnwindSafe(|| discover_global(catalog))) {
        Ok(registry) => registry,
        Err(panic) => {
            error!(
                error = %extract_panic_message(&panic),
                "Plugin discovery panicked; continuing without plugins"
            );
            PluginRegistry::empty()
        }
    };

    info!(
        plugins = registry.descriptors().len(),
        "Global plugin registry initialized"
    );
    let registry = Arc::new(registry);
    *slot = Some(Arc::clone(&registry));
    registry
}

/// The process-wide registry.
///
/// Falls back to an empty registry, installed on first use, when
/// [`initialize_global_registry`] was never called.
pub fn global_registry() -> Arc<PluginRegistry> {
    if let Some(registry) = GLOBAL_REGISTRY.read().as_ref() {
        return Arc::clone(registry);
    }
    initialize_global_registry(&PluginCatalog::new())
}

/// Check whether the process-wide registry has been initialized.
pub fn is_global_registry_initialized() -> bool {
    GLOBAL_REGISTRY.read().is_some()
}

/// Forget the process-wide registry so the next initialization runs
/// discovery again.
#[cfg(any(test, feature = "test-util"))]
pub fn reset_global_registry() {
    GLOBAL_REGISTRY.write().take();
}
