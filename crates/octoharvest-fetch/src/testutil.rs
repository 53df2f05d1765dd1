//! Shared fixtures for engine tests: an in-memory store and a canned-page
//! fetcher.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octoharvest_types::{
    EntityKind, ForkEvent, HarvestError, IssueRecord, PullRecord, RepoId, Result, StarEvent,
    Timestamped,
};
use serde_json::{json, Value};

use crate::page::{Page, PageFetcher};
use crate::store::ActivityStore;

/// In-memory [`ActivityStore`] with natural-key dedup.
#[derive(Debug, Default)]
pub(crate) struct MemStore {
    forks: Mutex<Vec<ForkEvent>>,
    stars: Mutex<Vec<StarEvent>>,
    issues: Mutex<Vec<IssueRecord>>,
    pulls: Mutex<Vec<PullRecord>>,
    fail_inserts: AtomicBool,
}

impl MemStore {
    pub(crate) fn forks(&self) -> Vec<ForkEvent> {
        self.forks.lock().unwrap().clone()
    }

    pub(crate) fn stars(&self) -> Vec<StarEvent> {
        self.stars.lock().unwrap().clone()
    }

    pub(crate) fn issues(&self) -> Vec<IssueRecord> {
        self.issues.lock().unwrap().clone()
    }

    pub(crate) fn pulls(&self) -> Vec<PullRecord> {
        self.pulls.lock().unwrap().clone()
    }

    /// Makes every subsequent insert fail, to exercise batch-failure paths.
    pub(crate) fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(HarvestError::Store("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for MemStore {
    async fn insert_forks(&self, batch: &[ForkEvent]) -> Result<u64> {
        self.check_failure()?;
        let mut rows = self.forks.lock().unwrap();
        let mut inserted = 0;
        for record in batch {
            let exists = rows.iter().any(|r| {
                r.repo == record.repo && r.actor == record.actor && r.forked_at == record.forked_at
            });
            if !exists {
                rows.push(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn insert_stars(&self, batch: &[StarEvent]) -> Result<u64> {
        self.check_failure()?;
        let mut rows = self.stars.lock().unwrap();
        let mut inserted = 0;
        for record in batch {
            let exists = rows.iter().any(|r| {
                r.repo == record.repo
                    && r.actor == record.actor
                    && r.starred_at == record.starred_at
            });
            if !exists {
                rows.push(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn insert_issues(&self, batch: &[IssueRecord]) -> Result<u64> {
        self.check_failure()?;
        let mut rows = self.issues.lock().unwrap();
        let mut inserted = 0;
        for record in batch {
            let exists = rows
                .iter()
                .any(|r| r.repo == record.repo && r.number == record.number);
            if !exists {
                rows.push(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn insert_pulls(&self, batch: &[PullRecord]) -> Result<u64> {
        self.check_failure()?;
        let mut rows = self.pulls.lock().unwrap();
        let mut inserted = 0;
        for record in batch {
            let exists = rows
                .iter()
                .any(|r| r.repo == record.repo && r.number == record.number);
            if !exists {
                rows.push(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn watermark(&self, repo: &RepoId, kind: EntityKind) -> Result<Option<DateTime<Utc>>> {
        fn max_ts<T: Timestamped>(rows: &[T], keep: impl Fn(&T) -> bool) -> Option<DateTime<Utc>> {
            rows.iter()
                .filter(|r| keep(r))
                .map(Timestamped::timestamp)
                .max()
        }

        Ok(match kind {
            EntityKind::Forks => max_ts(&self.forks.lock().unwrap(), |r| &r.repo == repo),
            EntityKind::Stars => max_ts(&self.stars.lock().unwrap(), |r| &r.repo == repo),
            EntityKind::Issues => max_ts(&self.issues.lock().unwrap(), |r| &r.repo == repo),
            EntityKind::Pulls => max_ts(&self.pulls.lock().unwrap(), |r| &r.repo == repo),
        })
    }
}

/// [`PageFetcher`] over canned pages, with optional failure injection.
#[derive(Debug)]
pub(crate) struct MockFetcher {
    pages: Vec<Vec<Value>>,
    per_page: usize,
    last_hint: Option<u32>,
    fail_at: Option<u32>,
    calls: AtomicU32,
}

impl MockFetcher {
    pub(crate) fn new(pages: Vec<Vec<Value>>, per_page: usize) -> Self {
        Self {
            pages,
            per_page,
            last_hint: None,
            fail_at: None,
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn with_last_hint(mut self, last_page: u32) -> Self {
        self.last_hint = Some(last_page);
        self
    }

    /// Fail the given 1-based page with an HTTP 500.
    pub(crate) fn failing_at(mut self, page: u32) -> Self {
        self.fail_at = Some(page);
        self
    }

    /// Number of pages requested so far.
    pub(crate) fn fetched(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, page: u32) -> Result<Page> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(page) {
            return Err(HarvestError::Status { status: 500 });
        }

        let items = self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default();
        Ok(Page {
            number: page,
            items,
            estimated_total: self.last_hint.map(|l| u64::from(l) * self.per_page as u64),
        })
    }

    fn per_page(&self) -> usize {
        self.per_page
    }
}

pub(crate) fn fork_item(actor: &str, created_at: &str) -> Value {
    json!({"owner": {"login": actor}, "created_at": created_at})
}

pub(crate) fn star_item(actor: &str, starred_at: &str) -> Value {
    json!({"user": {"login": actor}, "starred_at": starred_at})
}

pub(crate) fn issue_item(number: i64, actor: &str, created_at: &str, updated_at: &str) -> Value {
    json!({
        "number": number,
        "user": {"login": actor},
        "created_at": created_at,
        "closed_at": null,
        "comments": 0,
        "updated_at": updated_at
    })
}

pub(crate) fn pull_item(
    number: i64,
    actor: &str,
    created_at: &str,
    updated_at: &str,
    merged_at: Option<&str>,
) -> Value {
    json!({
        "number": number,
        "title": format!("change #{number}"),
        "user": {"login": actor},
        "created_at": created_at,
        "updated_at": updated_at,
        "pull_request": {"merged_at": merged_at}
    })
}
