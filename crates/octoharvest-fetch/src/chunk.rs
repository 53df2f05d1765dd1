//! Date-chunked page walks for feeds with no server-side time filter.
//!
//! The forks and stargazer feeds can only be scanned from the start, so the
//! cost of a harvest is bounded three ways:
//!
//! 1. the requested date range is split into fetch windows of at most
//!    [`FetchPolicy::max_window_days`] days;
//! 2. a walk stops as soon as an item falls past the window end (the next
//!    window covers it); the feed's ascending order is an upstream
//!    contract this depends on and does not verify;
//! 3. a run of [`FetchPolicy::empty_page_limit`] consecutive pages with no
//!    fresh records abandons the window. This trades a small risk of
//!    missing a late-arriving sparse record for a bounded worst-case
//!    request volume.
//!
//! Items at or below the persisted watermark are never re-persisted.
//! Completeness for a repository is operational ("no pending windows in the
//! configured range"); no window cursor is stored.

use chrono::{DateTime, Utc};
use octoharvest_types::{FetchWindow, Result, Timestamped};
use serde_json::Value;
use tracing::{debug, error};

use crate::page::PageFetcher;
use crate::store::BatchSink;
use crate::FetchPolicy;

/// Why a window walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// The feed ran out: an empty or short page.
    FeedEnd,
    /// An item fell past the window end; later windows cover the rest.
    PastWindow,
    /// The consecutive-empty heuristic fired.
    EmptyRun,
}

/// Outcome of one window walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowWalk {
    /// Pages requested.
    pub pages: u32,
    /// Records that were fresh: inside the window and above the watermark.
    pub fresh: u64,
    /// Rows actually stored (fresh records minus natural-key duplicates
    /// and failed batches).
    pub inserted: u64,
    /// Why the walk ended.
    pub stop: StopCause,
}

/// Walks one fetch window of an unfiltered ascending feed, persisting
/// fresh records page by page.
///
/// A batch that fails to persist is logged and treated as not stored; the
/// walk continues and the next run re-covers the range. Page-level fetch
/// failures propagate to the caller, which abandons this window only.
pub async fn walk_window<T, F, S, P>(
    window: FetchWindow,
    watermark: Option<DateTime<Utc>>,
    policy: &FetchPolicy,
    fetcher: &F,
    sink: &S,
    parse: P,
) -> Result<WindowWalk>
where
    T: Timestamped + Send + Sync,
    F: PageFetcher + Sync,
    S: BatchSink<T> + ?Sized,
    P: Fn(&Value) -> Option<T>,
{
    let mut stats = WindowWalk {
        pages: 0,
        fresh: 0,
        inserted: 0,
        stop: StopCause::FeedEnd,
    };
    let mut empty_run = 0u32;
    let mut page_no = 1u32;

    loop {
        let page = fetcher.fetch(page_no).await?;
        stats.pages += 1;

        if page.number == 1 {
            match page.estimated_total {
                Some(total) => debug!(%window, total, "walking window"),
                None => debug!(%window, "walking window, total unknown"),
            }
        }

        if page.items.is_empty() {
            stats.stop = StopCause::FeedEnd;
            break;
        }

        let mut batch = Vec::new();
        let mut past_window = false;
        for item in &page.items {
            let Some(record) = parse(item) else {
                debug!(page = page.number, "dropping item without usable timestamp");
                continue;
            };
            let ts = record.timestamp();

            // Already persisted up to the watermark; never re-persist.
            if watermark.is_some_and(|w| ts <= w) {
                continue;
            }
            // Ascending feed: the first item past the window end means the
            // rest of the feed belongs to later windows.
            if window.is_past(ts) {
                past_window = true;
                break;
            }
            // Feed head re-served from before the window.
            if ts.date_naive() < window.start {
                continue;
            }
            batch.push(record);
        }

        if batch.is_empty() {
            empty_run += 1;
        } else {
            empty_run = 0;
            stats.fresh += batch.len() as u64;
            match sink.persist(&batch).await {
                Ok(n) => stats.inserted += n,
                Err(e) => {
                    // Batch treated as not persisted; the watermark does not
                    // advance for it and the next run re-covers the range.
                    error!(%window, page = page.number, error = %e, "persist failed, continuing");
                }
            }
        }

        if past_window {
            stats.stop = StopCause::PastWindow;
            break;
        }
        if page.is_last(fetcher.per_page()) {
            stats.stop = StopCause::FeedEnd;
            break;
        }
        if empty_run >= policy.empty_page_limit {
            debug!(
                %window,
                pages = empty_run,
                "abandoning window after consecutive pages with no fresh records"
            );
            stats.stop = StopCause::EmptyRun;
            break;
        }

        page_no += 1;
    }

    debug!(
        %window,
        pages = stats.pages,
        fresh = stats.fresh,
        inserted = stats.inserted,
        stop = ?stats.stop,
        "window walk finished"
    );
    Ok(stats)
}
