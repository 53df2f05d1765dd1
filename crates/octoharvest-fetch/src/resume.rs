//! Watermark-resumed walks for the combined issue/pull listing.
//!
//! Issues and pull requests support a server-side `since` filter over
//! update time, so incremental harvests pass
//! `since = max(persisted watermark, configured start)` and page through an
//! ascending listing instead of re-scanning history. The two entity types
//! share one underlying listing and are told apart by the `pull_request`
//! discriminator; each harvest pass keeps one side and its own watermark.
//!
//! A record is persisted at most once per natural key. Fields that mutate
//! upstream after first capture (comment counts, merge times) are not
//! re-synchronized: first-seen snapshot semantics.

use chrono::{DateTime, Utc};
use octoharvest_types::{Result, Timestamped};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::page::PageFetcher;
use crate::store::BatchSink;

/// Why a resumed walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeStop {
    /// The listing ran out: an empty or short page.
    FeedEnd,
    /// An item arrived below the `since` cursor. The filtered listing is
    /// contractually ascending from `since`, so this is an assertion
    /// boundary: the rest of the page is discarded and the walk stops.
    OrderingViolation,
}

/// Outcome of one resumed walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeWalk {
    /// Pages requested.
    pub pages: u32,
    /// Items of the requested entity type seen.
    pub matched: u64,
    /// Rows actually stored.
    pub inserted: u64,
    /// Why the walk ended.
    pub stop: ResumeStop,
}

/// Walks the `since`-filtered listing from page 1, persisting records of
/// one entity type page by page.
///
/// `parse` keeps the caller's side of the discriminator (returning `None`
/// for the other type and for malformed items); `raw updated_at` is checked
/// for every item regardless, so an ordering violation on either type stops
/// the walk.
pub async fn walk_since<T, F, S, P>(
    since: DateTime<Utc>,
    fetcher: &F,
    sink: &S,
    parse: P,
) -> Result<ResumeWalk>
where
    T: Timestamped + Send + Sync,
    F: PageFetcher + Sync,
    S: BatchSink<T> + ?Sized,
    P: Fn(&Value) -> Option<T>,
{
    let mut stats = ResumeWalk {
        pages: 0,
        matched: 0,
        inserted: 0,
        stop: ResumeStop::FeedEnd,
    };
    let mut page_no = 1u32;

    loop {
        let page = fetcher.fetch(page_no).await?;
        stats.pages += 1;

        if page.number == 1 {
            match page.estimated_total {
                Some(total) => debug!(%since, total, "walking listing"),
                None => debug!(%since, "walking listing, total unknown"),
            }
        }

        if page.items.is_empty() {
            break;
        }

        let mut batch = Vec::new();
        let mut violation = false;
        for item in &page.items {
            if let Some(ts) = item_updated_at(item) {
                if ts < since {
                    warn!(
                        %since,
                        item_updated_at = %ts,
                        page = page.number,
                        "item below the since cursor, discarding rest of page"
                    );
                    violation = true;
                    break;
                }
            }
            if let Some(record) = parse(item) {
                batch.push(record);
            }
        }

        if !batch.is_empty() {
            stats.matched += batch.len() as u64;
            match sink.persist(&batch).await {
                Ok(n) => stats.inserted += n,
                Err(e) => {
                    error!(page = page.number, error = %e, "persist failed, continuing");
                }
            }
        }

        if violation {
            stats.stop = ResumeStop::OrderingViolation;
            break;
        }
        if page.is_last(fetcher.per_page()) {
            break;
        }
        page_no += 1;
    }

    debug!(
        %since,
        pages = stats.pages,
        matched = stats.matched,
        inserted = stats.inserted,
        "listing walk finished"
    );
    Ok(stats)
}

fn item_updated_at(item: &Value) -> Option<DateTime<Utc>> {
    item.get("updated_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// The resume cursor: the persisted watermark when it is ahead of the
/// configured start date, the start date otherwise.
#[must_use]
pub fn resume_cursor(
    watermark: Option<DateTime<Utc>>,
    configured_start: DateTime<Utc>,
) -> DateTime<Utc> {
    watermark.map_or(configured_start, |w| w.max(configured_start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{issue_item, pull_item, MemStore, MockFetcher};
    use crate::parse;
    use chrono::TimeZone;
    use octoharvest_types::{IssueRecord, PullRecord, RepoId};

    fn since(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_full_page_requests_next_and_short_page_stops() {
        // One full page of 50 ascending items ending below 2024-02-01,
        // then a short page: the walk must request page 2 and stop there.
        let repo = RepoId::new("octo", "demo");
        let full: Vec<_> = (0..50)
            .map(|i| {
                issue_item(
                    i,
                    "alice",
                    "2024-01-01T00:00:00Z",
                    &format!("2024-01-{:02}T12:00:00Z", (i % 28) + 1),
                )
            })
            .collect();
        let short = vec![issue_item(99, "bob", "2024-02-01T00:00:00Z", "2024-02-02T00:00:00Z")];

        let fetcher = MockFetcher::new(vec![full, short], 50).with_last_hint(2);
        let store = MemStore::default();

        let walk = walk_since(since(2024, 1, 1), &fetcher, &store, |item| {
            parse::issue(&repo, item)
        })
        .await
        .unwrap();

        assert_eq!(fetcher.fetched(), 2);
        assert_eq!(walk.pages, 2);
        assert_eq!(walk.stop, ResumeStop::FeedEnd);
        assert_eq!(store.issues().len(), 51);
    }

    #[tokio::test]
    async fn test_discriminator_splits_the_listing() {
        let repo = RepoId::new("octo", "demo");
        let mixed = vec![
            issue_item(1, "a", "2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"),
            pull_item(
                2,
                "b",
                "2024-01-01T00:00:00Z",
                "2024-01-03T00:00:00Z",
                Some("2024-01-02T12:00:00Z"),
            ),
            issue_item(3, "c", "2024-01-03T00:00:00Z", "2024-01-04T00:00:00Z"),
        ];
        let store = MemStore::default();
        let cursor = since(2024, 1, 1);

        let issues = walk_since(
            cursor,
            &MockFetcher::new(vec![mixed.clone()], 50),
            &store,
            |item| parse::issue(&repo, item),
        )
        .await
        .unwrap();
        let pulls = walk_since(
            cursor,
            &MockFetcher::new(vec![mixed], 50),
            &store,
            |item| parse::pull(&repo, item),
        )
        .await
        .unwrap();

        assert_eq!(issues.matched, 2);
        assert_eq!(pulls.matched, 1);
        assert_eq!(store.issues().len(), 2);
        assert_eq!(store.pulls().len(), 1);

        let stored_pull: Vec<PullRecord> = store.pulls();
        assert!(stored_pull[0].merged_at.is_some());
    }

    #[tokio::test]
    async fn test_ordering_violation_discards_rest_of_page() {
        let repo = RepoId::new("octo", "demo");
        let page = vec![
            issue_item(1, "a", "2024-01-01T00:00:00Z", "2024-03-01T00:00:00Z"),
            // Below the cursor: contract violation.
            issue_item(2, "b", "2023-01-01T00:00:00Z", "2023-06-01T00:00:00Z"),
            issue_item(3, "c", "2024-01-01T00:00:00Z", "2024-04-01T00:00:00Z"),
        ];
        let fetcher = MockFetcher::new(vec![page], 50);
        let store = MemStore::default();

        let walk = walk_since(since(2024, 1, 1), &fetcher, &store, |item| {
            parse::issue(&repo, item)
        })
        .await
        .unwrap();

        assert_eq!(walk.stop, ResumeStop::OrderingViolation);
        assert_eq!(store.issues().len(), 1);
        assert_eq!(store.issues()[0].number, 1);
    }

    #[tokio::test]
    async fn test_boundary_item_at_cursor_is_not_a_violation() {
        // `since` is inclusive upstream, so an item exactly at the cursor
        // is legitimate; the natural key makes re-persisting it a no-op.
        let repo = RepoId::new("octo", "demo");
        let cursor = since(2024, 1, 15);
        let page = vec![issue_item(
            7,
            "a",
            "2024-01-01T00:00:00Z",
            "2024-01-15T00:00:00Z",
        )];
        let fetcher = MockFetcher::new(vec![page], 50);
        let store = MemStore::default();

        let walk = walk_since(cursor, &fetcher, &store, |item| parse::issue(&repo, item))
            .await
            .unwrap();
        assert_eq!(walk.stop, ResumeStop::FeedEnd);
        assert_eq!(walk.matched, 1);
    }

    #[tokio::test]
    async fn test_resume_cursor() {
        let start = since(2024, 1, 1);
        assert_eq!(resume_cursor(None, start), start);
        assert_eq!(resume_cursor(Some(since(2023, 6, 1)), start), start);
        assert_eq!(
            resume_cursor(Some(since(2024, 6, 1)), start),
            since(2024, 6, 1)
        );
    }

    #[tokio::test]
    async fn test_rerun_inserts_nothing_new() {
        let repo = RepoId::new("octo", "demo");
        let page = vec![
            issue_item(1, "a", "2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"),
            issue_item(2, "b", "2024-01-02T00:00:00Z", "2024-01-03T00:00:00Z"),
        ];
        let store = MemStore::default();
        let cursor = since(2024, 1, 1);

        let first = walk_since(
            cursor,
            &MockFetcher::new(vec![page.clone()], 50),
            &store,
            |item| parse::issue(&repo, item),
        )
        .await
        .unwrap();
        let second = walk_since(
            cursor,
            &MockFetcher::new(vec![page], 50),
            &store,
            |item| parse::issue(&repo, item),
        )
        .await
        .unwrap();

        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(store.issues().len(), 2);
    }

    #[tokio::test]
    async fn test_issue_records_keep_first_seen_snapshot() {
        let repo = RepoId::new("octo", "demo");
        let store = MemStore::default();
        let cursor = since(2024, 1, 1);

        let v1 = vec![issue_item(5, "a", "2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z")];
        walk_since(cursor, &MockFetcher::new(vec![v1], 50), &store, |item| {
            parse::issue(&repo, item)
        })
        .await
        .unwrap();

        // Same issue, updated upstream: natural key already present, so the
        // stored row keeps its first-seen update time.
        let v2 = vec![issue_item(5, "a", "2024-01-01T00:00:00Z", "2024-02-10T00:00:00Z")];
        walk_since(cursor, &MockFetcher::new(vec![v2], 50), &store, |item| {
            parse::issue(&repo, item)
        })
        .await
        .unwrap();

        let rows: Vec<IssueRecord> = store.issues();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].updated_at,
            since(2024, 1, 2)
        );
    }
}
