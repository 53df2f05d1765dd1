//! Per-repository harvest orchestration.
//!
//! Strictly sequential by design: one repository and one entity type at a
//! time, forks and stars by chunked walk, then issues and pulls by
//! watermark resume. A failed entity or repository is logged and the run
//! moves on; only the inability to construct a working credential pool at
//! startup is fatal (it prevents [`crate::ApiClient`] creation).

use chrono::{DateTime, NaiveTime, Utc};
use octoharvest_types::{DateRange, EntityKind, HarvestError, RepoId};
use tracing::{info, warn};

use crate::chunk::{self, WindowWalk};
use crate::page::EndpointPager;
use crate::resume::{self, resume_cursor, ResumeWalk};
use crate::store::ActivityStore;
use crate::{parse, url, ApiClient, FetchPolicy};

/// One repository to harvest over one date range.
#[derive(Debug, Clone)]
pub struct HarvestTask {
    /// Repository to harvest.
    pub repo: RepoId,
    /// Date range to cover.
    pub range: DateRange,
}

/// Aggregated counters for one entity type of one repository.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EntityStats {
    /// Windows walked (1 for watermark-resumed entities).
    pub windows: u32,
    /// Pages requested.
    pub pages: u32,
    /// Fresh records seen.
    pub fresh: u64,
    /// Rows newly stored.
    pub inserted: u64,
}

impl EntityStats {
    fn absorb(&mut self, walk: WindowWalk) {
        self.windows += 1;
        self.pages += walk.pages;
        self.fresh += walk.fresh;
        self.inserted += walk.inserted;
    }
}

impl From<ResumeWalk> for EntityStats {
    fn from(walk: ResumeWalk) -> Self {
        Self {
            windows: 1,
            pages: walk.pages,
            fresh: walk.matched,
            inserted: walk.inserted,
        }
    }
}

/// Result of harvesting one entity type of one repository.
#[derive(Debug)]
pub struct EntityOutcome {
    /// The entity type.
    pub kind: EntityKind,
    /// Stats on success, the aborting error otherwise.
    pub result: Result<EntityStats, HarvestError>,
}

/// Result of harvesting one repository.
#[derive(Debug)]
pub struct RepoReport {
    /// The repository.
    pub repo: RepoId,
    /// One outcome per entity type, in processing order.
    pub outcomes: Vec<EntityOutcome>,
}

impl RepoReport {
    /// Total rows newly stored across all entity types.
    #[must_use]
    pub fn inserted(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|s| s.inserted)
            .sum()
    }

    /// Entity types whose harvest aborted.
    #[must_use]
    pub fn failed_kinds(&self) -> Vec<EntityKind> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.kind)
            .collect()
    }
}

/// Sequences chunked and watermark-resumed harvests over repositories.
#[derive(Debug)]
pub struct Harvester<'a, S> {
    client: &'a ApiClient,
    store: &'a S,
    policy: FetchPolicy,
}

impl<'a, S: ActivityStore> Harvester<'a, S> {
    /// Creates a harvester over an API client and a store.
    #[must_use]
    pub const fn new(client: &'a ApiClient, store: &'a S, policy: FetchPolicy) -> Self {
        Self {
            client,
            store,
            policy,
        }
    }

    /// Harvests one repository: forks, stars, issues, then pulls.
    ///
    /// A failed entity never aborts the others; it is reported in the
    /// returned outcomes and logged.
    pub async fn harvest_repo(&self, repo: &RepoId, range: DateRange) -> RepoReport {
        info!(repo = %repo, %range, "harvesting repository");
        let outcomes = vec![
            EntityOutcome {
                kind: EntityKind::Forks,
                result: self.harvest_forks(repo, range).await,
            },
            EntityOutcome {
                kind: EntityKind::Stars,
                result: self.harvest_stars(repo, range).await,
            },
            EntityOutcome {
                kind: EntityKind::Issues,
                result: self.harvest_issues(repo, range).await,
            },
            EntityOutcome {
                kind: EntityKind::Pulls,
                result: self.harvest_pulls(repo, range).await,
            },
        ];

        let report = RepoReport {
            repo: repo.clone(),
            outcomes,
        };
        for kind in report.failed_kinds() {
            warn!(repo = %report.repo, %kind, "entity harvest aborted, continuing");
        }
        report
    }

    async fn harvest_forks(&self, repo: &RepoId, range: DateRange) -> Result<EntityStats, HarvestError> {
        let pager = EndpointPager::new(self.client, url::forks(repo));
        self.walk_chunked(repo, EntityKind::Forks, range, &pager, |item| {
            parse::fork(repo, item)
        })
        .await
    }

    async fn harvest_stars(&self, repo: &RepoId, range: DateRange) -> Result<EntityStats, HarvestError> {
        let pager = EndpointPager::new(self.client, url::stargazers(repo));
        self.walk_chunked(repo, EntityKind::Stars, range, &pager, |item| {
            parse::star(repo, item)
        })
        .await
    }

    async fn walk_chunked<T, P>(
        &self,
        repo: &RepoId,
        kind: EntityKind,
        range: DateRange,
        pager: &EndpointPager<'_>,
        parse: P,
    ) -> Result<EntityStats, HarvestError>
    where
        T: octoharvest_types::Timestamped + Send + Sync,
        S: crate::BatchSink<T>,
        P: Fn(&serde_json::Value) -> Option<T> + Copy,
    {
        let watermark = self.store.watermark(repo, kind).await?;
        let Some(effective) = effective_range(range, watermark) else {
            info!(repo = %repo, %kind, "already covered through the range end, skipping");
            return Ok(EntityStats::default());
        };

        let mut stats = EntityStats::default();
        for window in effective.windows(self.policy.max_window_days) {
            // Re-derived per window so earlier windows shorten this one's scan.
            let watermark = self.store.watermark(repo, kind).await?;
            let walk =
                chunk::walk_window(window, watermark, &self.policy, pager, self.store, parse)
                    .await?;
            stats.absorb(walk);
        }

        info!(
            repo = %repo,
            %kind,
            windows = stats.windows,
            pages = stats.pages,
            inserted = stats.inserted,
            "chunked harvest done"
        );
        Ok(stats)
    }

    async fn harvest_issues(&self, repo: &RepoId, range: DateRange) -> Result<EntityStats, HarvestError> {
        let since = self.issue_cursor(repo, EntityKind::Issues, range).await?;
        let pager = EndpointPager::new(self.client, url::issues(repo, Some(since)));
        let walk = resume::walk_since(since, &pager, self.store, |item| parse::issue(repo, item))
            .await?;
        let stats = EntityStats::from(walk);
        info!(repo = %repo, kind = %EntityKind::Issues, %since, inserted = stats.inserted, "resumed harvest done");
        Ok(stats)
    }

    async fn harvest_pulls(&self, repo: &RepoId, range: DateRange) -> Result<EntityStats, HarvestError> {
        let since = self.issue_cursor(repo, EntityKind::Pulls, range).await?;
        let pager = EndpointPager::new(self.client, url::issues(repo, Some(since)));
        let walk = resume::walk_since(since, &pager, self.store, |item| parse::pull(repo, item))
            .await?;
        let stats = EntityStats::from(walk);
        info!(repo = %repo, kind = %EntityKind::Pulls, %since, inserted = stats.inserted, "resumed harvest done");
        Ok(stats)
    }

    async fn issue_cursor(
        &self,
        repo: &RepoId,
        kind: EntityKind,
        range: DateRange,
    ) -> Result<DateTime<Utc>, HarvestError> {
        let watermark = self.store.watermark(repo, kind).await?;
        Ok(resume_cursor(
            watermark,
            range.start.and_time(NaiveTime::MIN).and_utc(),
        ))
    }
}

/// Clamps a date range to what the watermark has not yet covered.
///
/// Returns `None` when storage already covers past the range end.
fn effective_range(range: DateRange, watermark: Option<DateTime<Utc>>) -> Option<DateRange> {
    let Some(watermark) = watermark else {
        return Some(range);
    };
    let covered_through = watermark.date_naive();
    if covered_through <= range.start {
        return Some(range);
    }
    if covered_through > range.end {
        return None;
    }
    // The watermark day itself is re-scanned; natural keys dedup the overlap.
    DateRange::new(covered_through, range.end).ok()
}
