//! Typed activity records.
//!
//! Each record is an immutable value built once from the raw API payload
//! and persisted verbatim. The natural key per entity:
//!
//! - forks: (repository, actor, forked_at)
//! - stars: (repository, actor, starred_at)
//! - issues: (repository, issue number)
//! - pulls: (repository, pull number)

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::RepoId;

/// The four harvested activity feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum EntityKind {
    /// Repository forks.
    #[display("forks")]
    Forks,
    /// Stargazer events.
    #[display("stars")]
    Stars,
    /// Plain issues (pull requests excluded).
    #[display("issues")]
    Issues,
    /// Pull requests.
    #[display("pulls")]
    Pulls,
}

impl EntityKind {
    /// All kinds in the order the orchestrator processes them.
    pub const ALL: [Self; 4] = [Self::Forks, Self::Stars, Self::Issues, Self::Pulls];

    /// Storage table name for this kind.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Forks => "forks",
            Self::Stars => "stars",
            Self::Issues => "issues",
            Self::Pulls => "pulls",
        }
    }
}

/// A record type with the timestamp used for ordering and watermarks.
///
/// Forks and stars order by creation time; issues and pulls order by
/// update time, matching the upstream `sort=updated` listing.
pub trait Timestamped {
    /// The ordering timestamp of this record.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// A repository fork observed in the forks feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkEvent {
    /// The forked repository.
    pub repo: RepoId,
    /// Login of the account that created the fork.
    pub actor: String,
    /// When the fork was created.
    pub forked_at: DateTime<Utc>,
}

impl Timestamped for ForkEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.forked_at
    }
}

/// A star observed in the stargazers feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarEvent {
    /// The starred repository.
    pub repo: RepoId,
    /// Login of the stargazer.
    pub actor: String,
    /// When the star was given.
    pub starred_at: DateTime<Utc>,
}

impl Timestamped for StarEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.starred_at
    }
}

/// A plain issue from the combined issue/pull listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// The repository the issue belongs to.
    pub repo: RepoId,
    /// Issue number, unique within the repository.
    pub number: i64,
    /// When the issue was opened.
    pub created_at: DateTime<Utc>,
    /// When the issue was closed, if it has been.
    pub closed_at: Option<DateTime<Utc>>,
    /// Comment count at capture time (first-seen snapshot).
    pub comment_count: i64,
    /// Login of the issue author.
    pub actor: String,
    /// Last update time, used for the incremental watermark.
    pub updated_at: DateTime<Utc>,
}

impl Timestamped for IssueRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// A pull request from the combined issue/pull listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRecord {
    /// The repository the pull request belongs to.
    pub repo: RepoId,
    /// Pull request number, unique within the repository.
    pub number: i64,
    /// When the pull request was opened.
    pub created_at: DateTime<Utc>,
    /// When the pull request was merged, if it has been.
    pub merged_at: Option<DateTime<Utc>>,
    /// Login of the pull request author.
    pub actor: String,
    /// Pull request title at capture time (first-seen snapshot).
    pub title: String,
    /// Last update time, used for the incremental watermark.
    pub updated_at: DateTime<Utc>,
}

impl Timestamped for PullRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
