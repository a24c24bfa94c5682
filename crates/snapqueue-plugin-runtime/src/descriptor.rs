//! Plugin descriptors and manifest parsing.
//!
//! Each plugin implementation is registered with a TOML manifest describing
//! its metadata, instantiation policy and supported events, plus a factory
//! that constructs the live plugin object.

use crate::capability::DeclaredCapabilities;
use crate::error::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};
use snapqueue_plugin_api::{
    AccountEventType, ApplicationEventType, BatchEventType, ConfigurationEventType,
    GeneralAccountEventType, PictureEventType, Plugin, PluginResult, RenderingContentType,
    ScheduledTaskEventType,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Factory constructing a fresh live plugin object.
pub type PluginFactory = Arc<dyn Fn() -> PluginResult<Box<dyn Plugin>> + Send + Sync>;

/// How many instances of one descriptor may coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstantiationPolicy {
    /// No restriction.
    #[default]
    MultiplePerScope,
    /// At most one instance within one collection.
    SinglePerScope,
    /// At most one instance across all collections.
    SinglePerApplication,
}

impl fmt::Display for InstantiationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstantiationPolicy::MultiplePerScope => write!(f, "multiple_per_scope"),
            InstantiationPolicy::SinglePerScope => write!(f, "single_per_scope"),
            InstantiationPolicy::SinglePerApplication => write!(f, "single_per_application"),
        }
    }
}

/// Plugin manifest structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin metadata.
    pub plugin: PluginMetadata,

    /// Supported event values per taxonomy.
    #[serde(default)]
    pub supports: SupportsSection,
}

/// Plugin metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Stable, fully-qualified implementation id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// One-line purpose.
    pub purpose: String,

    /// Long description.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub instantiation: InstantiationPolicy,
}

/// The `[supports]` section: event value names per taxonomy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportsSection {
    #[serde(default)]
    pub application: Vec<String>,
    #[serde(default)]
    pub configuration: Vec<String>,
    #[serde(default)]
    pub general_account: Vec<String>,
    #[serde(default)]
    pub account: Vec<String>,
    #[serde(default)]
    pub batch: Vec<String>,
    #[serde(default)]
    pub picture: Vec<String>,
    #[serde(default)]
    pub scheduled_task: Vec<String>,
    #[serde(default)]
    pub rendering: Vec<String>,
}

impl PluginManifest {
    /// Parse a manifest from a TOML string.
    pub fn from_str(content: &str) -> RuntimeResult<Self> {
        let manifest: PluginManifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest.
    fn validate(&self) -> RuntimeResult<()> {
        if self.plugin.id.trim().is_empty() {
            return Err(RuntimeError::InvalidManifest(
                "Plugin ID cannot be empty".to_string(),
            ));
        }

        if self.plugin.name.trim().is_empty() {
            return Err(RuntimeError::InvalidManifest(
                "Plugin name cannot be empty".to_string(),
            ));
        }

        if self.plugin.purpose.trim().is_empty() {
            return Err(RuntimeError::InvalidManifest(
                "Plugin purpose cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the declared event names into typed capability sets.
    pub fn capabilities(&self) -> RuntimeResult<DeclaredCapabilities> {
        let s = &self.supports;
        Ok(DeclaredCapabilities {
            application: parse_values(
                ApplicationEventType::TAXONOMY,
                &s.application,
                ApplicationEventType::parse,
            )?,
            configuration: parse_values(
                ConfigurationEventType::TAXONOMY,
                &s.configuration,
                ConfigurationEventType::parse,
            )?,
            general_account: parse_values(
                GeneralAccountEventType::TAXONOMY,
                &s.general_account,
                GeneralAccountEventType::parse,
            )?,
            account: parse_values(AccountEventType::TAXONOMY, &s.account, AccountEventType::parse)?,
            batch: parse_values(BatchEventType::TAXONOMY, &s.batch, BatchEventType::parse)?,
            picture: parse_values(PictureEventType::TAXONOMY, &s.picture, PictureEventType::parse)?,
            scheduled_task: parse_values(
                ScheduledTaskEventType::TAXONOMY,
                &s.scheduled_task,
                ScheduledTaskEventType::parse,
            )?,
            rendering: parse_values(
                RenderingContentType::TAXONOMY,
                &s.rendering,
                RenderingContentType::parse,
            )?,
        })
    }
}

fn parse_values<T: Ord>(
    taxonomy: &str,
    names: &[String],
    parse: fn(&str) -> Option<T>,
) -> RuntimeResult<BTreeSet<T>> {
    names
        .iter()
        .map(|name| {
            parse(name).ok_or_else(|| {
                RuntimeError::InvalidManifest(format!("Unknown {taxonomy} value '{name}'"))
            })
        })
        .collect()
}

/// One entry of the registration table: a manifest plus a factory.
#[derive(Clone)]
pub struct PluginImplementation {
    /// TOML manifest text.
    pub manifest: String,

    /// Constructs the live plugin object.
    pub factory: PluginFactory,
}

impl PluginImplementation {
    pub fn new<F>(manifest: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> PluginResult<Box<dyn Plugin>> + Send + Sync + 'static,
    {
        Self {
            manifest: manifest.into(),
            factory: Arc::new(factory),
        }
    }
}

impl fmt::Debug for PluginImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginImplementation")
            .field("manifest", &self.manifest)
            .finish_non_exhaustive()
    }
}

/// Immutable metadata and declared capabilities of one plugin implementation.
#[derive(Clone)]
pub struct PluginDescriptor {
    id: String,
    name: String,
    purpose: String,
    description: String,
    author: Option<String>,
    version: Option<String>,
    url: Option<String>,
    instantiation: InstantiationPolicy,
    capabilities: DeclaredCapabilities,
    collections: Vec<String>,
    factory: PluginFactory,
}

impl PluginDescriptor {
    /// Build a descriptor from a registration table entry.
    pub fn from_implementation(implementation: &PluginImplementation) -> RuntimeResult<Self> {
        let manifest = PluginManifest::from_str(&implementation.manifest)?;
        let capabilities = manifest.capabilities()?;
        let meta = manifest.plugin;

        Ok(Self {
            id: meta.id,
            name: meta.name,
            purpose: meta.purpose,
            description: meta.description,
            author: meta.author,
            version: meta.version,
            url: meta.url,
            instantiation: meta.instantiation,
            capabilities,
            collections: Vec::new(),
            factory: Arc::clone(&implementation.factory),
        })
    }

    /// Record the collections this descriptor was placed in.
    pub(crate) fn set_collections(&mut self, collections: Vec<String>) {
        self.collections = collections;
    }

    /// Construct a fresh live plugin object.
    pub(crate) fn instantiate(&self) -> PluginResult<Box<dyn Plugin>> {
        (self.factory)()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn instantiation(&self) -> InstantiationPolicy {
        self.instantiation
    }

    pub fn capabilities(&self) -> &DeclaredCapabilities {
        &self.capabilities
    }

    /// Ids of every collection this descriptor is eligible for.
    pub fn collections(&self) -> &[String] {
        &self.collections
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("instantiation", &self.instantiation)
            .field("capabilities", &self.capabilities)
            .field("collections", &self.collections)
            .finish_non_exhaustive()
    }
}
