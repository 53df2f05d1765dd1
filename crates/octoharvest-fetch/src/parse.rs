//! Raw payload to typed record conversion.
//!
//! A record missing its required timestamp is dropped, not fatal; malformed
//! optional fields degrade to their defaults.

use chrono::{DateTime, Utc};
use octoharvest_types::{ForkEvent, IssueRecord, PullRecord, RepoId, StarEvent};
use serde_json::Value;

/// Parses an RFC 3339 timestamp field.
fn timestamp(value: &Value, field: &str) -> Option<DateTime<Utc>> {
    value
        .get(field)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Login of a nested account object such as `owner` or `user`.
fn login(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(|account| account.get("login"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// A fork item from the forks feed.
pub(crate) fn fork(repo: &RepoId, item: &Value) -> Option<ForkEvent> {
    Some(ForkEvent {
        repo: repo.clone(),
        actor: login(item, "owner"),
        forked_at: timestamp(item, "created_at")?,
    })
}

/// A stargazer item from the star+json media type.
pub(crate) fn star(repo: &RepoId, item: &Value) -> Option<StarEvent> {
    Some(StarEvent {
        repo: repo.clone(),
        actor: login(item, "user"),
        starred_at: timestamp(item, "starred_at")?,
    })
}

/// True if a combined-listing item is a pull request.
///
/// The discriminator object is present only on pull-request-like items.
pub(crate) fn is_pull_item(item: &Value) -> bool {
    item.get("pull_request").is_some()
}

/// A plain issue from the combined listing. Returns `None` for pull items.
pub(crate) fn issue(repo: &RepoId, item: &Value) -> Option<IssueRecord> {
    if is_pull_item(item) {
        return None;
    }
    Some(IssueRecord {
        repo: repo.clone(),
        number: item.get("number")?.as_i64()?,
        created_at: timestamp(item, "created_at")?,
        closed_at: timestamp(item, "closed_at"),
        comment_count: item.get("comments").and_then(Value::as_i64).unwrap_or(0),
        actor: login(item, "user"),
        updated_at: timestamp(item, "updated_at")?,
    })
}

/// A pull request from the combined listing. Returns `None` for plain issues.
pub(crate) fn pull(repo: &RepoId, item: &Value) -> Option<PullRecord> {
    let discriminator = item.get("pull_request")?;
    Some(PullRecord {
        repo: repo.clone(),
        number: item.get("number")?.as_i64()?,
        created_at: timestamp(item, "created_at")?,
        merged_at: timestamp(discriminator, "merged_at"),
        actor: login(item, "user"),
        title: item
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        updated_at: timestamp(item, "updated_at")?,
    })
}
