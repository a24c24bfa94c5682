//! Template tokens: `{Name}` placeholders filled from event payloads.

use regex::{Captures, Regex};
use snapqueue_plugin_api::{
    AccountInfo, ApplicationInfo, EventPayload, PictureInfo, TemplateToken, TokenValues,
};
use snapqueue_plugin_runtime::TokenKind;
use std::sync::LazyLock;

/// Tokens a collection of the given kind can supply.
pub fn tokens_for(kind: TokenKind) -> Vec<TemplateToken> {
    let names: &[(&str, &str)] = match kind {
        TokenKind::Application => &[
            ("AppName", "Application name"),
            ("AppVersion", "Application version"),
            ("Today", "Current date (YYYY-MM-DD)"),
        ],
        TokenKind::Account => &[("AccountId", "Account id"), ("AccountName", "Account name")],
        TokenKind::Batch => &[
            ("BatchId", "Batch id"),
            ("BatchSize", "Number of pictures in the batch"),
        ],
        TokenKind::Picture => &[
            ("PictureId", "Picture id"),
            ("FileName", "File name"),
            ("Title", "Picture title"),
            ("Description", "Picture description"),
            ("Tags", "Comma separated tags"),
            ("DateTaken", "Date the picture was taken"),
        ],
        TokenKind::ScheduledTask => &[("TaskName", "Scheduled task name")],
    };
    names
        .iter()
        .map(|(name, description)| TemplateToken::new(*name, *description))
        .collect()
}

/// Fill `tokens` from the application info and an event payload.
pub fn populate(application: &ApplicationInfo, payload: EventPayload<'_>, tokens: &mut TokenValues) {
    insert(tokens, "AppName", &application.name);
    insert(tokens, "AppVersion", &application.version);
    insert(
        tokens,
        "Today",
        &chrono::Utc::now().format("%Y-%m-%d").to_string(),
    );

    match payload {
        EventPayload::Application(_) => {}
        EventPayload::Account(account) => populate_account(account, tokens),
        EventPayload::Batch { account, batch } => {
            populate_account(account, tokens);
            insert(tokens, "BatchId", &batch.id);
            insert(tokens, "BatchSize", &batch.pictures.len().to_string());
        }
        EventPayload::Picture { account, picture } => {
            populate_account(account, tokens);
            populate_picture(picture, tokens);
        }
        EventPayload::ScheduledTask(task) => insert(tokens, "TaskName", &task.name),
    }
}

fn populate_account(account: &AccountInfo, tokens: &mut TokenValues) {
    insert(tokens, "AccountId", &account.id);
    insert(tokens, "AccountName", &account.name);
}

fn populate_picture(picture: &PictureInfo, tokens: &mut TokenValues) {
    insert(tokens, "PictureId", &picture.id);
    insert(tokens, "FileName", &picture.file_name);
    insert(tokens, "Title", &picture.title);
    insert(tokens, "Description", &picture.description);
    insert(tokens, "Tags", &picture.tags.join(", "));
    let date_taken = picture
        .date_taken
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    insert(tokens, "DateTaken", &date_taken);
}

fn insert(tokens: &mut TokenValues, name: &str, value: &str) {
    tokens.insert(name.to_string(), value.to_string());
}

/// A `{Name}` placeholder; group 1 is the token name.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("token pattern is valid"));

/// Replace every `{Name}` with its value. Unknown tokens are left as is.
pub fn substitute(template: &str, tokens: &TokenValues) -> String {
    TOKEN_PATTERN
        .replace_all(template, |caps: &Captures<'_>| match tokens.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Names of the `{Name}` tokens referenced by a template, in order.
pub fn referenced_tokens(template: &str) -> Vec<&str> {
    TOKEN_PATTERN
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|name| name.as_str())
        .collect()
}
