//! Idempotent schema provisioning.
//!
//! Four logical tables, each keyed by its record's natural key, with a
//! (repo, timestamp) secondary index backing the watermark queries.

use sqlx::SqlitePool;

const DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS forks (
        repo       TEXT NOT NULL,
        actor      TEXT NOT NULL,
        forked_at  TEXT NOT NULL,
        PRIMARY KEY (repo, actor, forked_at)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_forks_repo_date ON forks (repo, forked_at)",
    r#"
    CREATE TABLE IF NOT EXISTS stars (
        repo        TEXT NOT NULL,
        actor       TEXT NOT NULL,
        starred_at  TEXT NOT NULL,
        PRIMARY KEY (repo, actor, starred_at)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_stars_repo_date ON stars (repo, starred_at)",
    r#"
    CREATE TABLE IF NOT EXISTS issues (
        repo           TEXT NOT NULL,
        number         INTEGER NOT NULL,
        created_at     TEXT NOT NULL,
        closed_at      TEXT,
        comment_count  INTEGER NOT NULL DEFAULT 0,
        actor          TEXT NOT NULL DEFAULT '',
        updated_at     TEXT NOT NULL,
        PRIMARY KEY (repo, number)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_issues_repo_date ON issues (repo, updated_at)",
    r#"
    CREATE TABLE IF NOT EXISTS pulls (
        repo        TEXT NOT NULL,
        number      INTEGER NOT NULL,
        created_at  TEXT NOT NULL,
        merged_at   TEXT,
        actor       TEXT NOT NULL DEFAULT '',
        title       TEXT NOT NULL DEFAULT '',
        updated_at  TEXT NOT NULL,
        PRIMARY KEY (repo, number)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_pulls_repo_date ON pulls (repo, updated_at)",
];

/// Creates the tables and indexes if missing. Safe to run on every start.
pub(crate) async fn provision(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in DDL {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
