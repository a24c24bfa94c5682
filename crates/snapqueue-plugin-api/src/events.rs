//! Event taxonomies and the arguments dispatched with each event.
//!
//! Every taxonomy is a closed set. The runtime enumerates `ALL` for each one
//! to build exactly one collection per event value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! event_values {
    (
        $(#[$meta:meta])*
        $name:ident, $taxonomy:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Every value of this taxonomy, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Name of the taxonomy, used as the collection id prefix.
            pub const TAXONOMY: &'static str = $taxonomy;

            /// Parse a value from its snake_case name.
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Snake_case name of this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

event_values! {
    /// Application lifecycle events.
    ApplicationEventType, "application" {
        Initialized => "initialized",
        Activated => "activated",
        Deactivated => "deactivated",
        Closing => "closing",
    }
}

event_values! {
    /// Configuration persistence events.
    ConfigurationEventType, "configuration" {
        Loaded => "loaded",
        Saving => "saving",
        Saved => "saved",
    }
}

event_values! {
    /// Events about the set of accounts known to the application.
    GeneralAccountEventType, "general_account" {
        Adding => "adding",
        Added => "added",
        Removed => "removed",
    }
}

event_values! {
    /// Events about the currently active account.
    AccountEventType, "account" {
        Activated => "activated",
        Deactivated => "deactivated",
        SettingsChanged => "settings_changed",
    }
}

event_values! {
    /// Batch upload events.
    BatchEventType, "batch" {
        Uploading => "uploading",
        Uploaded => "uploaded",
    }
}

event_values! {
    /// Picture queue and upload events.
    PictureEventType, "picture" {
        Adding => "adding",
        Added => "added",
        Removed => "removed",
        Uploading => "uploading",
        Uploaded => "uploaded",
        UploadFailed => "upload_failed",
    }
}

event_values! {
    /// Scheduled task events.
    ScheduledTaskEventType, "scheduled_task" {
        Starting => "starting",
        Completed => "completed",
    }
}

event_values! {
    /// Content types a rendering plugin can declare interest in.
    RenderingContentType, "rendering" {
        Picture => "picture",
        Video => "video",
    }
}

/// One concrete event value from any taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Application(ApplicationEventType),
    Configuration(ConfigurationEventType),
    GeneralAccount(GeneralAccountEventType),
    Account(AccountEventType),
    Batch(BatchEventType),
    Picture(PictureEventType),
    ScheduledTask(ScheduledTaskEventType),
}

impl EventKind {
    /// Every event value of every taxonomy.
    pub fn all() -> impl Iterator<Item = EventKind> {
        let application = ApplicationEventType::ALL.iter().copied().map(EventKind::Application);
        let configuration = ConfigurationEventType::ALL
            .iter()
            .copied()
            .map(EventKind::Configuration);
        let general_account = GeneralAccountEventType::ALL
            .iter()
            .copied()
            .map(EventKind::GeneralAccount);
        let account = AccountEventType::ALL.iter().copied().map(EventKind::Account);
        let batch = BatchEventType::ALL.iter().copied().map(EventKind::Batch);
        let picture = PictureEventType::ALL.iter().copied().map(EventKind::Picture);
        let scheduled_task = ScheduledTaskEventType::ALL
            .iter()
            .copied()
            .map(EventKind::ScheduledTask);

        application
            .chain(configuration)
            .chain(general_account)
            .chain(account)
            .chain(batch)
            .chain(picture)
            .chain(scheduled_task)
    }

    /// Taxonomy name, e.g. `picture`.
    pub fn taxonomy(&self) -> &'static str {
        match self {
            EventKind::Application(_) => ApplicationEventType::TAXONOMY,
            EventKind::Configuration(_) => ConfigurationEventType::TAXONOMY,
            EventKind::GeneralAccount(_) => GeneralAccountEventType::TAXONOMY,
            EventKind::Account(_) => AccountEventType::TAXONOMY,
            EventKind::Batch(_) => BatchEventType::TAXONOMY,
            EventKind::Picture(_) => PictureEventType::TAXONOMY,
            EventKind::ScheduledTask(_) => ScheduledTaskEventType::TAXONOMY,
        }
    }

    /// Value name within the taxonomy, e.g. `uploaded`.
    pub fn value(&self) -> &'static str {
        match self {
            EventKind::Application(e) => e.as_str(),
            EventKind::Configuration(e) => e.as_str(),
            EventKind::GeneralAccount(e) => e.as_str(),
            EventKind::Account(e) => e.as_str(),
            EventKind::Batch(e) => e.as_str(),
            EventKind::Picture(e) => e.as_str(),
            EventKind::ScheduledTask(e) => e.as_str(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.taxonomy(), self.value())
    }
}

/// Template token values, keyed by token name.
pub type TokenValues = BTreeMap<String, String>;

/// Static information about the running application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub name: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
}

/// An account on the photo-sharing service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub name: String,
}

/// A queued picture or video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureInfo {
    pub id: String,
    pub file_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub date_taken: Option<DateTime<Utc>>,
}

/// A batch of pictures uploaded together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInfo {
    pub id: String,
    pub pictures: Vec<PictureInfo>,
}

/// A scheduled task run by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTaskInfo {
    pub name: String,
}

/// Arguments for application events.
#[derive(Debug, Clone)]
pub struct ApplicationEventArgs {
    pub event: ApplicationEventType,
    pub application: ApplicationInfo,
    pub tokens: TokenValues,
}

/// Arguments for configuration events.
#[derive(Debug, Clone)]
pub struct ConfigurationEventArgs {
    pub event: ConfigurationEventType,
    pub application: ApplicationInfo,
    pub tokens: TokenValues,
}

/// Arguments for general account events.
#[derive(Debug, Clone)]
pub struct GeneralAccountEventArgs {
    pub event: GeneralAccountEventType,
    pub account: AccountInfo,
    pub tokens: TokenValues,
}

/// Arguments for account events.
#[derive(Debug, Clone)]
pub struct AccountEventArgs {
    pub event: AccountEventType,
    pub account: AccountInfo,
    pub tokens: TokenValues,
}

/// Arguments for batch events.
#[derive(Debug, Clone)]
pub struct BatchEventArgs {
    pub event: BatchEventType,
    pub account: AccountInfo,
    pub batch: BatchInfo,
    pub tokens: TokenValues,
}

/// Arguments for picture events.
#[derive(Debug, Clone)]
pub struct PictureEventArgs {
    pub event: PictureEventType,
    pub account: AccountInfo,
    pub picture: PictureInfo,
    pub tokens: TokenValues,
}

/// Arguments for scheduled task events.
#[derive(Debug, Clone)]
pub struct ScheduledTaskEventArgs {
    pub event: ScheduledTaskEventType,
    pub task: ScheduledTaskInfo,
    pub tokens: TokenValues,
}

/// Arguments for one pass of the rendering pipeline.
#[derive(Debug, Clone)]
pub struct RenderingArgs {
    pub content_type: RenderingContentType,
    pub account: AccountInfo,
    pub picture: PictureInfo,
    pub tokens: TokenValues,
}

/// Borrowed view of an event payload, handed to the template collaborator
/// so it can fill the token map before dispatch.
#[derive(Debug, Clone, Copy)]
pub enum EventPayload<'a> {
    Application(&'a ApplicationInfo),
    Account(&'a AccountInfo),
    Batch {
        account: &'a AccountInfo,
        batch: &'a BatchInfo,
    },
    Picture {
        account: &'a AccountInfo,
        picture: &'a PictureInfo,
    },
    ScheduledTask(&'a ScheduledTaskInfo),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for value in PictureEventType::ALL {
            assert_eq!(PictureEventType::parse(value.as_str()), Some(*value));
        }
        assert_eq!(PictureEventType::parse("nope"), None);
    }

    #[test]
    fn test_event_kind_display() {
        let kind = EventKind::Picture(PictureEventType::UploadFailed);
        assert_eq!(kind.to_string(), "picture:upload_failed");
        assert_eq!(
            EventKind::GeneralAccount(GeneralAccountEventType::Added).to_string(),
            "general_account:added"
        );
    }

    #[test]
    fn test_all_event_kinds_are_distinct() {
        let kinds: Vec<EventKind> = EventKind::all().collect();
        let distinct: std::collections::HashSet<String> =
            kinds.iter().map(|k| k.to_string()).collect();
        assert_eq!(kinds.len(), distinct.len());
        assert_eq!(kinds.len(), 4 + 3 + 3 + 3 + 2 + 6 + 2);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&AccountEventType::SettingsChanged).unwrap();
        assert_eq!(json, "\"settings_changed\"");
    }
}
