//! Endpoint construction for the upstream API.

use chrono::{DateTime, SecondsFormat, Utc};
use octoharvest_types::RepoId;

/// Default media type for API responses.
pub const MEDIA_JSON: &str = "application/vnd.github.v3+json";

/// Media type required for stargazer timestamps: the plain listing omits
/// `starred_at`.
pub const MEDIA_STAR: &str = "application/vnd.github.v3.star+json";

/// Page size for the fork and stargazer feeds.
pub const PER_PAGE_EVENTS: usize = 100;

/// Page size for the combined issue/pull listing.
pub const PER_PAGE_ISSUES: usize = 50;

/// A paged collection endpoint: path, fixed query, media type, page size.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Path below the API base.
    pub path: String,
    /// Fixed query parameters (page cursors are appended by the pager).
    pub query: Vec<(String, String)>,
    /// `Accept` header value.
    pub accept: &'static str,
    /// Fixed page size.
    pub per_page: usize,
}

/// The forks feed, ascending by fork creation time.
#[must_use]
pub fn forks(repo: &RepoId) -> Endpoint {
    Endpoint {
        path: format!("/repos/{}/{}/forks", repo.owner, repo.name),
        query: vec![("sort".to_string(), "oldest".to_string())],
        accept: MEDIA_JSON,
        per_page: PER_PAGE_EVENTS,
    }
}

/// The stargazers feed, ascending by star time by construction.
#[must_use]
pub fn stargazers(repo: &RepoId) -> Endpoint {
    Endpoint {
        path: format!("/repos/{}/{}/stargazers", repo.owner, repo.name),
        query: Vec::new(),
        accept: MEDIA_STAR,
        per_page: PER_PAGE_EVENTS,
    }
}

/// The combined issue/pull listing, ascending by update time, optionally
/// filtered server-side to items updated at or after `since`.
#[must_use]
pub fn issues(repo: &RepoId, since: Option<DateTime<Utc>>) -> Endpoint {
    let mut query = vec![
        ("state".to_string(), "all".to_string()),
        ("sort".to_string(), "updated".to_string()),
        ("direction".to_string(), "asc".to_string()),
    ];
    if let Some(since) = since {
        query.push((
            "since".to_string(),
            since.to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
    }

    Endpoint {
        path: format!("/repos/{}/{}/issues", repo.owner, repo.name),
        query,
        accept: MEDIA_JSON,
        per_page: PER_PAGE_ISSUES,
    }
}
