//! The storage seam the engine persists through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octoharvest_types::{EntityKind, ForkEvent, IssueRecord, PullRecord, RepoId, Result, StarEvent};

/// Idempotent activity storage.
///
/// Implementations insert records whose natural key is absent and leave
/// existing keys untouched; each insert method reports how many rows were
/// newly stored. The watermark is derived from storage on demand and never
/// cached across runs.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Inserts fork events, skipping natural keys already present.
    async fn insert_forks(&self, batch: &[ForkEvent]) -> Result<u64>;

    /// Inserts star events, skipping natural keys already present.
    async fn insert_stars(&self, batch: &[StarEvent]) -> Result<u64>;

    /// Inserts issues, skipping natural keys already present.
    async fn insert_issues(&self, batch: &[IssueRecord]) -> Result<u64>;

    /// Inserts pull requests, skipping natural keys already present.
    async fn insert_pulls(&self, batch: &[PullRecord]) -> Result<u64>;

    /// Maximum ordering timestamp persisted for this repository and entity,
    /// or `None` if nothing is stored yet.
    async fn watermark(&self, repo: &RepoId, kind: EntityKind) -> Result<Option<DateTime<Utc>>>;
}

/// Uniform per-record-type persistence used by the generic page walks.
#[async_trait]
pub trait BatchSink<T>: Send + Sync {
    /// Persists one batch, returning the count of newly stored rows.
    async fn persist(&self, batch: &[T]) -> Result<u64>;
}

#[async_trait]
impl<S: ActivityStore> BatchSink<ForkEvent> for S {
    async fn persist(&self, batch: &[ForkEvent]) -> Result<u64> {
        self.insert_forks(batch).await
    }
}

#[async_trait]
impl<S: ActivityStore> BatchSink<StarEvent> for S {
    async fn persist(&self, batch: &[StarEvent]) -> Result<u64> {
        self.insert_stars(batch).await
    }
}

#[async_trait]
impl<S: ActivityStore> BatchSink<IssueRecord> for S {
    async fn persist(&self, batch: &[IssueRecord]) -> Result<u64> {
        self.insert_issues(batch).await
    }
}

#[async_trait]
impl<S: ActivityStore> BatchSink<PullRecord> for S {
    async fn persist(&self, batch: &[PullRecord]) -> Result<u64> {
        self.insert_pulls(batch).await
    }
}
