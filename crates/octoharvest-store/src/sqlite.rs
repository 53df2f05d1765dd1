//! SQLite-backed `ActivityStore` implementation.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octoharvest_fetch::ActivityStore;
use octoharvest_types::{
    EntityKind, ForkEvent, HarvestError, IssueRecord, PullRecord, RepoId, StarEvent,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::debug;

use crate::schema;

/// Errors from the SQLite store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database access failed.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Store directory could not be created.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for HarvestError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

/// SQLite implementation of the engine's `ActivityStore` seam.
///
/// Writes are per-batch transactions; there is no cross-page or
/// cross-window transaction. Natural-key conflicts are ignored, which is
/// what makes re-running after a crash safe.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at the given path and
    /// provisions the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened.
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(StoreError::from)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        schema::provision(&pool).await?;
        debug!(path = %path.display(), "store ready");
        Ok(Self { pool })
    }

    /// Opens an in-memory database. Used by tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub async fn connect_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        schema::provision(&pool).await?;
        Ok(Self { pool })
    }

    /// Number of stored rows for a repository and entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self, repo: &RepoId, kind: EntityKind) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE repo = ?", kind.table());
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(repo.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn max_timestamp(
        &self,
        table: &str,
        column: &str,
        repo: &RepoId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let sql = format!("SELECT MAX({column}) FROM {table} WHERE repo = ?");
        let max: Option<DateTime<Utc>> = sqlx::query_scalar(&sql)
            .bind(repo.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(max)
    }
}

#[async_trait]
impl ActivityStore for SqliteStore {
    async fn insert_forks(&self, batch: &[ForkEvent]) -> octoharvest_types::Result<u64> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        let mut inserted = 0;
        for record in batch {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO forks (repo, actor, forked_at) VALUES (?, ?, ?)",
            )
            .bind(record.repo.to_string())
            .bind(&record.actor)
            .bind(record.forked_at)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;
            inserted += result.rows_affected();
        }
        tx.commit().await.map_err(StoreError::from)?;
        Ok(inserted)
    }

    async fn insert_stars(&self, batch: &[StarEvent]) -> octoharvest_types::Result<u64> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        let mut inserted = 0;
        for record in batch {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO stars (repo, actor, starred_at) VALUES (?, ?, ?)",
            )
            .bind(record.repo.to_string())
            .bind(&record.actor)
            .bind(record.starred_at)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;
            inserted += result.rows_affected();
        }
        tx.commit().await.map_err(StoreError::from)?;
        Ok(inserted)
    }

    async fn insert_issues(&self, batch: &[IssueRecord]) -> octoharvest_types::Result<u64> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        let mut inserted = 0;
        for record in batch {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO issues
                    (repo, number, created_at, closed_at, comment_count, actor, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.repo.to_string())
            .bind(record.number)
            .bind(record.created_at)
            .bind(record.closed_at)
            .bind(record.comment_count)
            .bind(&record.actor)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;
            inserted += result.rows_affected();
        }
        tx.commit().await.map_err(StoreError::from)?;
        Ok(inserted)
    }

    async fn insert_pulls(&self, batch: &[PullRecord]) -> octoharvest_types::Result<u64> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        let mut inserted = 0;
        for record in batch {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO pulls
                    (repo, number, created_at, merged_at, actor, title, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.repo.to_string())
            .bind(record.number)
            .bind(record.created_at)
            .bind(record.merged_at)
            .bind(&record.actor)
            .bind(&record.title)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;
            inserted += result.rows_affected();
        }
        tx.commit().await.map_err(StoreError::from)?;
        Ok(inserted)
    }

    async fn watermark(
        &self,
        repo: &RepoId,
        kind: EntityKind,
    ) -> octoharvest_types::Result<Option<DateTime<Utc>>> {
        let (table, column) = match kind {
            EntityKind::Forks => ("forks", "forked_at"),
            EntityKind::Stars => ("stars", "starred_at"),
            EntityKind::Issues => ("issues", "updated_at"),
            EntityKind::Pulls => ("pulls", "updated_at"),
        };
        Ok(self.max_timestamp(table, column, repo).await?)
    }
}
