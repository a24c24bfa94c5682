//! Plugin discovery from a registration table.
//!
//! Implementations are registered explicitly in a [`PluginCatalog`] under an
//! implementation name. [`discover`] turns each entry into a
//! [`PluginDescriptor`], skipping entries whose manifest is unusable, and
//! then partitions the descriptors into one [`CollectionSpec`] per event
//! value plus one for rendering.

use crate::capability::CollectionKey;
use crate::collection::CollectionSpec;
use crate::descriptor::{PluginDescriptor, PluginImplementation};
use crate::error::{RuntimeError, RuntimeResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registration table of plugin implementations visible to the process.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    entries: Vec<(String, PluginImplementation)>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an implementation under its implementation name.
    pub fn register(&mut self, name: impl Into<String>, implementation: PluginImplementation) {
        self.entries.push((name.into(), implementation));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, implementation: PluginImplementation) -> Self {
        self.register(name, implementation);
        self
    }

    /// Append every entry of another catalog.
    pub fn extend(&mut self, other: PluginCatalog) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PluginImplementation)> {
        self.entries.iter().map(|(name, imp)| (name.as_str(), imp))
    }
}

/// Result of one discovery pass.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Descriptors with their collection back-references filled in.
    pub descriptors: Vec<Arc<PluginDescriptor>>,
    /// One spec per collection key, in [`CollectionKey::all`] order.
    pub collections: Vec<Arc<CollectionSpec>>,
    /// Implementations that were skipped.
    pub skipped: Vec<RuntimeError>,
}

/// Build descriptors and collection specs from a catalog.
///
/// Never fails as a whole: an implementation whose descriptor cannot be
/// built is logged and recorded in [`Discovery::skipped`].
pub fn discover(catalog: &PluginCatalog) -> Discovery {
    let mut built = Vec::new();
    let mut skipped = Vec::new();
    let mut seen_ids = HashSet::new();

    for (name, implementation) in catalog.iter() {
        match build_descriptor(name, implementation, &seen_ids) {
            Ok(descriptor) => {
                info!(
                    plugin = %descriptor.id(),
                    implementation = %name,
                    "Discovered plugin: {}",
                    descriptor.name()
                );
                seen_ids.insert(descriptor.id().to_string());
                built.push(descriptor);
            }
            Err(e) => {
                warn!(implementation = %name, error = %e, "Skipping plugin implementation");
                skipped.push(e);
            }
        }
    }

    let keys: Vec<CollectionKey> = CollectionKey::all().collect();

    // Back-references first, so collection specs share the final descriptors.
    let descriptors: Vec<Arc<PluginDescriptor>> = built
        .into_iter()
        .map(|mut descriptor| {
            let collections = keys
                .iter()
                .filter(|key| key.accepts(descriptor.capabilities()))
                .map(CollectionKey::id)
                .collect::<Vec<_>>();
            debug!(plugin = %descriptor.id(), ?collections, "Placed plugin in collections");
            descriptor.set_collections(collections);
            Arc::new(descriptor)
        })
        .collect();

    let collections = keys
        .into_iter()
        .map(|key| Arc::new(CollectionSpec::new(key, &descriptors)))
        .collect();

    info!(
        discovered = descriptors.len(),
        skipped = skipped.len(),
        "Plugin discovery finished"
    );

    Discovery {
        descriptors,
        collections,
        skipped,
    }
}

fn build_descriptor(
    name: &str,
    implementation: &PluginImplementation,
    seen_ids: &HashSet<String>,
) -> RuntimeResult<PluginDescriptor> {
    let discovery_error = |reason: String| RuntimeError::Discovery {
        implementation: name.to_string(),
        reason,
    };

    let descriptor = PluginDescriptor::from_implementation(implementation)
        .map_err(|e| discovery_error(e.to_string()))?;

    if seen_ids.contains(descriptor.id()) {
        return Err(discovery_error(format!(
            "Duplicate plugin id '{}'",
            descriptor.id()
        )));
    }

    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapqueue_plugin_api::{Plugin, PluginError, PluginResult};

    fn no_factory() -> PluginResult<Box<dyn Plugin>> {
        Err(PluginError::failed("not constructible"))
    }

    fn implementation(id: &str, supports: &str) -> PluginImplementation {
        PluginImplementation::new(
            format!(
                r#"
[plugin]
id = "{id}"
name = "Plugin {id}"
purpose = "Testing"

[supports]
{supports}
"#
            ),
            no_factory,
        )
    }

    #[test]
    fn test_discover_partitions_by_declared_values() {
        let catalog = PluginCatalog::new()
            .with("a", implementation("acme.a", r#"picture = ["added", "removed"]"#))
            .with("b", implementation("acme.b", r#"rendering = ["video"]"#));

        let discovery = discover(&catalog);
        assert_eq!(discovery.descriptors.len(), 2);
        assert!(discovery.skipped.is_empty());

        let added = discovery
            .collections
            .iter()
            .find(|c| c.id() == "picture:added")
            .unwrap();
        assert!(added.is_eligible("acme.a"));
        assert!(!added.is_eligible("acme.b"));

        let rendering = discovery
            .collections
            .iter()
            .find(|c| c.id() == "rendering")
            .unwrap();
        assert_eq!(rendering.eligible().len(), 1);
        assert_eq!(rendering.eligible()[0].id(), "acme.b");

        assert_eq!(
            discovery.descriptors[0].collections(),
            ["picture:added".to_string(), "picture:removed".to_string()]
        );
    }

    #[test]
    fn test_discover_skips_broken_implementations() {
        let catalog = PluginCatalog::new()
            .with("good", implementation("acme.good", r#"batch = ["uploaded"]"#))
            .with("bad-value", implementation("acme.bad", r#"batch = ["exploded"]"#))
            .with("not-toml", PluginImplementation::new("[plugin", no_factory))
            .with("dup", implementation("acme.good", r#"batch = ["uploading"]"#));

        let discovery = discover(&catalog);
        assert_eq!(discovery.descriptors.len(), 1);
        assert_eq!(discovery.skipped.len(), 3);
        assert!(discovery
            .skipped
            .iter()
            .all(|e| matches!(e, RuntimeError::Discovery { .. })));
        assert!(discovery.skipped[2].to_string().contains("Duplicate plugin id"));
    }

    #[test]
    fn test_empty_catalog_still_builds_every_collection() {
        let discovery = discover(&PluginCatalog::new());
        assert!(discovery.descriptors.is_empty());
        assert_eq!(discovery.collections.len(), CollectionKey::all().count());
        assert!(discovery.collections.iter().all(|c| c.eligible().is_empty()));
    }
}
