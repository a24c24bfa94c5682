//! Declared capabilities and the collection taxonomy built from them.
//!
//! A plugin implementation declares, per event taxonomy, the set of event
//! values it supports, plus the rendering content types it wants to see.
//! Discovery uses these sets to decide which collections a descriptor is
//! eligible for.

use serde::{Deserialize, Serialize};
use snapqueue_plugin_api::{
    AccountEventType, ApplicationEventType, BatchEventType, ConfigurationEventType, EventKind,
    GeneralAccountEventType, PictureEventType, RenderingContentType, ScheduledTaskEventType,
};
use std::collections::BTreeSet;
use std::fmt;

/// Id of the single rendering collection.
pub const RENDERING_COLLECTION_ID: &str = "rendering";

/// Event values and rendering content types one implementation supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredCapabilities {
    pub application: BTreeSet<ApplicationEventType>,
    pub configuration: BTreeSet<ConfigurationEventType>,
    pub general_account: BTreeSet<GeneralAccountEventType>,
    pub account: BTreeSet<AccountEventType>,
    pub batch: BTreeSet<BatchEventType>,
    pub picture: BTreeSet<PictureEventType>,
    pub scheduled_task: BTreeSet<ScheduledTaskEventType>,
    pub rendering: BTreeSet<RenderingContentType>,
}

impl DeclaredCapabilities {
    /// Check whether the event value is declared.
    pub fn supports_event(&self, kind: &EventKind) -> bool {
        match kind {
            EventKind::Application(e) => self.application.contains(e),
            EventKind::Configuration(e) => self.configuration.contains(e),
            EventKind::GeneralAccount(e) => self.general_account.contains(e),
            EventKind::Account(e) => self.account.contains(e),
            EventKind::Batch(e) => self.batch.contains(e),
            EventKind::Picture(e) => self.picture.contains(e),
            EventKind::ScheduledTask(e) => self.scheduled_task.contains(e),
        }
    }

    /// Check whether the rendering content type is declared.
    pub fn supports_rendering(&self, content_type: RenderingContentType) -> bool {
        self.rendering.contains(&content_type)
    }

    /// Check whether any rendering content type is declared.
    pub fn is_renderer(&self) -> bool {
        !self.rendering.is_empty()
    }

    /// Check whether anything at all is declared.
    pub fn is_empty(&self) -> bool {
        self.application.is_empty()
            && self.configuration.is_empty()
            && self.general_account.is_empty()
            && self.account.is_empty()
            && self.batch.is_empty()
            && self.picture.is_empty()
            && self.scheduled_task.is_empty()
            && self.rendering.is_empty()
    }
}

/// Lifetime scope of a collection's instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionScope {
    /// Loaded at startup, unloaded at process shutdown.
    Application,
    /// Loaded when an account is activated, unloaded at account teardown.
    Account,
}

impl fmt::Display for CollectionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionScope::Application => write!(f, "application"),
            CollectionScope::Account => write!(f, "account"),
        }
    }
}

/// What a collection dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionCategory {
    ApplicationEvents,
    AccountEvents,
    Rendering,
}

/// Kinds of template tokens a collection can supply to its plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Application,
    Account,
    Batch,
    Picture,
    ScheduledTask,
}

/// Key identifying one collection: an event value or the rendering category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKey {
    Event(EventKind),
    Rendering,
}

impl CollectionKey {
    /// Every collection key, events first, rendering last.
    pub fn all() -> impl Iterator<Item = CollectionKey> {
        EventKind::all()
            .map(CollectionKey::Event)
            .chain(std::iter::once(CollectionKey::Rendering))
    }

    /// Stable collection id, e.g. `picture:uploaded` or `rendering`.
    pub fn id(&self) -> String {
        match self {
            CollectionKey::Event(kind) => kind.to_string(),
            CollectionKey::Rendering => RENDERING_COLLECTION_ID.to_string(),
        }
    }

    pub fn scope(&self) -> CollectionScope {
        match self {
            CollectionKey::Event(
                EventKind::Application(_)
                | EventKind::Configuration(_)
                | EventKind::GeneralAccount(_)
                | EventKind::ScheduledTask(_),
            ) => CollectionScope::Application,
            CollectionKey::Event(
                EventKind::Account(_) | EventKind::Batch(_) | EventKind::Picture(_),
            )
            | CollectionKey::Rendering => CollectionScope::Account,
        }
    }

    pub fn category(&self) -> CollectionCategory {
        match (self, self.scope()) {
            (CollectionKey::Rendering, _) => CollectionCategory::Rendering,
            (_, CollectionScope::Application) => CollectionCategory::ApplicationEvents,
            (_, CollectionScope::Account) => CollectionCategory::AccountEvents,
        }
    }

    /// Token kinds the collection supplies to templates.
    pub fn token_kinds(&self) -> Vec<TokenKind> {
        let mut kinds = vec![TokenKind::Application];
        match self {
            CollectionKey::Event(EventKind::Application(_) | EventKind::Configuration(_)) => {}
            CollectionKey::Event(EventKind::GeneralAccount(_) | EventKind::Account(_)) => {
                kinds.push(TokenKind::Account);
            }
            CollectionKey::Event(EventKind::Batch(_)) => {
                kinds.extend([TokenKind::Account, TokenKind::Batch]);
            }
            CollectionKey::Event(EventKind::Picture(_)) | CollectionKey::Rendering => {
                kinds.extend([TokenKind::Account, TokenKind::Picture]);
            }
            CollectionKey::Event(EventKind::ScheduledTask(_)) => {
                kinds.push(TokenKind::ScheduledTask);
            }
        }
        kinds
    }

    /// Human description of the collection.
    pub fn description(&self) -> String {
        match self {
            CollectionKey::Event(kind) => format!(
                "Plugins notified on {} event '{}'",
                kind.taxonomy().replace('_', " "),
                kind.value().replace('_', " ")
            ),
            CollectionKey::Rendering => {
                "Plugins transforming picture and video files before upload".to_string()
            }
        }
    }

    /// Check whether a descriptor with these declarations is eligible.
    pub fn accepts(&self, declared: &DeclaredCapabilities) -> bool {
        match self {
            CollectionKey::Event(kind) => declared.supports_event(kind),
            CollectionKey::Rendering => declared.is_renderer(),
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}
